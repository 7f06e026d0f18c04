//! # Wrapper: the per-service state machine.
//!
//! One [`Wrapper`] exists per registered service. It owns the service's
//! termination and completion tokens, runs the lifecycle hooks around the
//! service body, and publishes the terminal status the reconciler acts on.
//!
//! ```text
//!  register ──► Registered ──run()──► Running ──service returns──┐
//!                                                               ▼
//!                               shutdown_request? ──yes──► Stopped
//!                                        │no
//!                                        ▼
//!                                     Exited ──reconciler──► Running again
//!                                        │                     (backoff)
//!                                        └── retries used up ► Exhausted
//! ```
//!
//! ## Token discipline
//! - `term` is cancelled at most once per run (by [`Wrapper::stop`]) and
//!   reallocated before every run; a cancelled token cannot be reused.
//! - `done` is cancelled exactly once per run, after post-hooks, and always
//!   after the terminal-status write. Waiters that clone `done` therefore
//!   observe a fully published terminal state.
//! - The `active` flag is the exactly-one-run guard: a second `run()` while
//!   one is in flight returns immediately.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::RuntimeError;
use crate::hooks::HookRef;
use crate::services::{
    AutoRestartOptions, ScheduleOptions, ServiceOptions, ServiceRef, ServiceReport, ServiceState,
};

/// Mutable wrapper state, guarded by one short-lived mutex.
///
/// The wrapper's own run task is the only writer of `status` during a run;
/// the reconciler reads it under the registry lock and tolerates staleness.
struct Inner {
    status: ServiceState,
    term: CancellationToken,
    done: CancellationToken,
    started_at: Option<Instant>,
    starts: u64,
    retry_count: u32,
}

/// State machine around one user service.
pub(crate) struct Wrapper {
    service: ServiceRef,
    name: String,

    pre_hooks: Vec<HookRef>,
    post_hooks: Vec<HookRef>,

    restart: AutoRestartOptions,
    // Reserved: stored for forward compatibility, never evaluated.
    #[allow(dead_code)]
    schedule: ScheduleOptions,

    inner: Mutex<Inner>,

    /// Set while a run body is in flight.
    active: AtomicBool,
    /// Set by stop(); read at the end of the run to pick Stopped vs Exited.
    shutdown_request: AtomicBool,
    /// Set while a backoff relaunch is pending, so the reconciler skips the
    /// wrapper instead of double-launching it.
    pending_start: AtomicBool,
}

impl Wrapper {
    pub(crate) fn new(service: ServiceRef, mut opts: ServiceOptions) -> Self {
        opts.sanitize();

        let name = service.name().to_string();
        Self {
            service,
            name,
            pre_hooks: opts.pre_hooks,
            post_hooks: opts.post_hooks,
            restart: opts.auto_restart,
            schedule: opts.schedule,
            inner: Mutex::new(Inner {
                status: ServiceState::Registered,
                term: CancellationToken::new(),
                done: CancellationToken::new(),
                started_at: None,
                starts: 0,
                retry_count: 0,
            }),
            active: AtomicBool::new(false),
            shutdown_request: AtomicBool::new(false),
            pending_start: AtomicBool::new(false),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn status(&self) -> ServiceState {
        self.lock_inner().status
    }

    pub(crate) fn restart_policy(&self) -> AutoRestartOptions {
        self.restart
    }

    pub(crate) fn retry_count(&self) -> u32 {
        self.lock_inner().retry_count
    }

    pub(crate) fn pending_start(&self) -> bool {
        self.pending_start.load(Ordering::SeqCst)
    }

    /// Claims one auto-restart attempt: bumps the retry counter and raises
    /// `pending_start` so the next reconciler tick skips this wrapper.
    pub(crate) fn begin_retry(&self) {
        self.lock_inner().retry_count += 1;
        self.pending_start.store(true, Ordering::SeqCst);
    }

    /// Marks the wrapper exhausted. Terminal: the reconciler never relaunches
    /// an exhausted wrapper.
    pub(crate) fn mark_exhausted(&self) {
        self.lock_inner().status = ServiceState::Exhausted;
    }

    /// Executes one full run of the service: hooks, body, terminal status.
    ///
    /// Idempotent while a run is in flight. The service body executes in its
    /// own task so a panic cannot skip the post-hooks or the `done`
    /// publication.
    pub(crate) async fn run(self: Arc<Self>) {
        if self.active.swap(true, Ordering::SeqCst) {
            log::info!("service {} is already running", self.name);
            return;
        }

        // Fresh tokens every run: the previous pair is spent.
        let (term, done) = {
            let mut inner = self.lock_inner();
            inner.term = CancellationToken::new();
            inner.done = CancellationToken::new();
            (inner.term.clone(), inner.done.clone())
        };

        self.run_hooks(&self.pre_hooks, "pre").await;

        {
            let mut inner = self.lock_inner();
            inner.status = ServiceState::Running;
            inner.started_at = Some(Instant::now());
            inner.starts += 1;
        }
        self.pending_start.store(false, Ordering::SeqCst);

        log::info!("starting service {} ...", self.name);

        let service = self.service.clone();
        let body = tokio::spawn(async move { service.start(term).await });
        match body.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("service {} returned error: {e}", self.name),
            Err(e) => log::error!("service {} panicked: {e}", self.name),
        }

        self.run_hooks(&self.post_hooks, "post").await;

        let status = {
            let mut inner = self.lock_inner();
            inner.status = if self.shutdown_request.swap(false, Ordering::SeqCst) {
                ServiceState::Stopped
            } else {
                ServiceState::Exited
            };
            inner.started_at = None;
            inner.status
        };

        log::info!("service {} status [{status}]", self.name);

        // Order matters: the active guard must clear before done fires so a
        // stop-and-wait caller can immediately relaunch without overlap, and
        // done must fire last so waiters observe the terminal status.
        self.active.store(false, Ordering::SeqCst);
        done.cancel();
    }

    /// Requests a stop: raises `shutdown_request`, then cancels `term`.
    ///
    /// Non-blocking. The flag is set before the cancellation so a service
    /// that exits instantly still terminates as `Stopped`, not `Exited`.
    pub(crate) fn stop(&self) -> Result<(), RuntimeError> {
        let inner = self.lock_inner();
        if inner.status != ServiceState::Running {
            return Err(RuntimeError::ServiceNotRunning {
                name: self.name.clone(),
            });
        }

        log::info!("stopping service {} ...", self.name);

        self.shutdown_request.store(true, Ordering::SeqCst);
        inner.term.cancel();

        Ok(())
    }

    /// Stops the service and blocks until its run body has fully returned.
    pub(crate) async fn stop_and_wait(&self) {
        let done = {
            let inner = self.lock_inner();
            if inner.status != ServiceState::Running {
                return;
            }
            self.shutdown_request.store(true, Ordering::SeqCst);
            inner.term.cancel();
            inner.done.clone()
        };

        log::info!("waiting for service {} to exit ...", self.name);
        done.cancelled().await;
    }

    /// Stop used by the shutdown barrier: returns the run's `done` token when
    /// the wrapper was running, so the caller can wait on all of them at once.
    pub(crate) fn stop_for_barrier(&self) -> Option<CancellationToken> {
        let inner = self.lock_inner();
        if inner.status != ServiceState::Running {
            return None;
        }
        self.shutdown_request.store(true, Ordering::SeqCst);
        inner.term.cancel();
        Some(inner.done.clone())
    }

    pub(crate) fn report(&self) -> ServiceReport {
        let inner = self.lock_inner();
        ServiceReport {
            status: inner.status,
            uptime: inner
                .started_at
                .map(|t| t.elapsed())
                .unwrap_or(Duration::ZERO),
            restarts: inner.starts.saturating_sub(1),
        }
    }

    async fn run_hooks(&self, hooks: &[HookRef], stage: &str) {
        for h in hooks {
            log::info!(
                "executing {stage}-hook {} for service {} ...",
                h.name(),
                self.name
            );
            if let Err(e) = h.execute().await {
                log::error!(
                    "{stage}-hook {} failed for service {}: {e}",
                    h.name(),
                    self.name
                );
            }
        }
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Lock poisoning would mean a panic inside one of the short critical
        // sections above, none of which call user code.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
