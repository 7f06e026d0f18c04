//! # Supervisor: registry, boot loop, and bounded shutdown.
//!
//! The [`Supervisor`] owns the name→wrapper registry and drives it with a
//! periodic reconciliation sweep. Externally it exposes the registration
//! surface, the stop/restart/status commands (also reachable through the
//! control socket), and a graceful shutdown bounded by a configurable budget.
//!
//! ## Architecture
//! ```text
//! register_service() ──► registry (Mutex<name → Wrapper>)
//!
//! boot_up(ctx)
//!     ├──► control socket task (if configured)
//!     └──► loop select:
//!           ├──► OS signal / ctx cancelled ──► shutdown()
//!           └──► 1s tick ──► reconcile(registry)
//!
//! shutdown()
//!     ├──► stop every running wrapper (under the lock, non-blocking)
//!     └──► wait on their done tokens, at most shutdown_timeout
//! ```
//!
//! ## Rules
//! - Registration is allowed only while the supervisor is not running, so the
//!   reconciler's view of the registry is stable within a tick.
//! - Command dispatch holds the registry lock; the shutdown barrier wait does
//!   not.
//! - Stopped-by-command services stay stopped; the reconciler only relaunches
//!   services that exited on their own.

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::Mutex;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::{
    reconciler::{self, RECONCILE_INTERVAL},
    signals,
    wrapper::Wrapper,
};
use crate::error::RuntimeError;
use crate::services::{ServiceOptions, ServiceRef, ServiceState, StatusSnapshot};

/// In-process service lifecycle manager.
///
/// Create with [`Supervisor::new`], register services, then call
/// [`Supervisor::boot_up`] — it blocks until a termination signal (or the
/// provided cancellation token) triggers shutdown.
pub struct Supervisor {
    cfg: Config,
    registry: Mutex<HashMap<String, Arc<Wrapper>>>,
    is_running: AtomicBool,
}

impl Supervisor {
    /// Creates a new supervisor with the given configuration.
    pub fn new(mut cfg: Config) -> Arc<Self> {
        cfg.sanitize();
        Arc::new(Self {
            cfg,
            registry: Mutex::new(HashMap::new()),
            is_running: AtomicBool::new(false),
        })
    }

    /// Returns true while the boot loop is active.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Registers a service under its name.
    ///
    /// Fails with [`RuntimeError::AlreadyRunning`] once the supervisor has
    /// booted, and with [`RuntimeError::ServiceAlreadyExists`] on a duplicate
    /// name.
    pub async fn register_service(
        &self,
        service: ServiceRef,
        opts: ServiceOptions,
    ) -> Result<(), RuntimeError> {
        if self.is_running() {
            return Err(RuntimeError::AlreadyRunning);
        }

        let mut registry = self.registry.lock().await;
        let name = service.name().to_string();
        if registry.contains_key(&name) {
            return Err(RuntimeError::ServiceAlreadyExists { name });
        }

        registry.insert(name, Arc::new(Wrapper::new(service, opts)));
        Ok(())
    }

    /// Removes a service from the registry, stopping it first if running.
    pub async fn deregister_service(&self, name: &str) -> Result<(), RuntimeError> {
        let mut registry = self.registry.lock().await;
        match registry.remove(name) {
            Some(wrapper) => {
                if wrapper.status() == ServiceState::Running {
                    if let Err(e) = wrapper.stop() {
                        log::warn!("failed to stop service {name}: {e}");
                    }
                }
                Ok(())
            }
            None => Err(RuntimeError::ServiceNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Boots the supervisor and blocks until shutdown completes.
    ///
    /// Starts the control socket (when configured), then loops on the
    /// reconciliation ticker until a termination signal arrives or `ctx` is
    /// cancelled, and finally runs [`Supervisor::shutdown`].
    pub async fn boot_up(self: &Arc<Self>, ctx: CancellationToken) -> Result<(), RuntimeError> {
        if self.is_running.swap(true, Ordering::SeqCst) {
            return Err(RuntimeError::AlreadyRunning);
        }

        log::info!("booting up the supervisor ...");

        #[cfg(unix)]
        let socket = if self.cfg.socket {
            let socket = crate::control::ControlSocket::new(
                Arc::downgrade(self),
                self.cfg.socket_path.clone(),
                self.cfg.allowed_uids.clone(),
            );
            let token = CancellationToken::new();
            let handle = tokio::spawn(socket.serve(token.clone()));
            Some((token, handle))
        } else {
            None
        };

        #[cfg(not(unix))]
        if self.cfg.socket {
            log::warn!("control socket is unix-only, not starting it on this platform");
        }

        let signal = signals::wait_for_shutdown_signal();
        tokio::pin!(signal);

        let mut tick = interval_at(Instant::now() + RECONCILE_INTERVAL, RECONCILE_INTERVAL);

        loop {
            tokio::select! {
                _ = &mut signal => break,
                _ = ctx.cancelled() => break,
                _ = tick.tick() => {
                    let registry = self.registry.lock().await;
                    reconciler::reconcile(&registry);
                }
            }
        }

        log::info!("received shutdown signal");
        self.shutdown().await;

        #[cfg(unix)]
        if let Some((token, handle)) = socket {
            token.cancel();
            if let Err(e) = handle.await {
                log::error!("control socket task failed: {e}");
            }
        }

        log::info!("all services stopped, exiting");
        Ok(())
    }

    /// Stops every running service and waits for them, bounded by the
    /// configured shutdown timeout. Services that ignore their termination
    /// token are abandoned; the supervisor reports not running regardless.
    pub async fn shutdown(&self) {
        log::info!("shutting down supervisor ...");

        let barrier: Vec<(String, CancellationToken)> = {
            let registry = self.registry.lock().await;
            registry
                .iter()
                .filter_map(|(name, w)| w.stop_for_barrier().map(|done| (name.clone(), done)))
                .collect()
        };

        log::info!("waiting for {} service(s) to stop ...", barrier.len());

        let all_done = futures::future::join_all(barrier.iter().map(|(_, done)| done.cancelled()));
        if tokio::time::timeout(self.cfg.shutdown_timeout, all_done)
            .await
            .is_err()
        {
            let stuck: Vec<String> = barrier
                .iter()
                .filter(|(_, done)| !done.is_cancelled())
                .map(|(name, _)| name.clone())
                .collect();
            log::warn!(
                "{}",
                RuntimeError::ShutdownTimeout {
                    timeout: self.cfg.shutdown_timeout,
                    stuck,
                }
            );
        }

        self.is_running.store(false, Ordering::SeqCst);
    }

    /// Stops the named services, waiting for each to fully exit. Names that
    /// are unknown or not running are skipped.
    pub async fn stop_service<S: AsRef<str>>(&self, names: &[S]) -> Result<(), RuntimeError> {
        let registry = self.registry.lock().await;
        for name in names {
            if let Some(wrapper) = registry.get(name.as_ref()) {
                if wrapper.status() == ServiceState::Running {
                    wrapper.stop_and_wait().await;
                }
            }
        }
        Ok(())
    }

    /// Stops every running service and waits for all of them.
    pub async fn stop_all_services(&self) {
        let barrier: Vec<CancellationToken> = {
            let registry = self.registry.lock().await;
            registry
                .values()
                .filter_map(|w| w.stop_for_barrier())
                .collect()
        };

        futures::future::join_all(barrier.iter().map(|done| done.cancelled())).await;
    }

    /// Restarts the named services: stop-and-wait if running, then relaunch.
    /// Unknown names are skipped.
    pub async fn restart_service<S: AsRef<str>>(&self, names: &[S]) -> Result<(), RuntimeError> {
        let registry = self.registry.lock().await;
        for name in names {
            if let Some(wrapper) = registry.get(name.as_ref()) {
                if wrapper.status() == ServiceState::Running {
                    wrapper.stop_and_wait().await;
                }
                tokio::spawn(wrapper.clone().run());
            }
        }
        Ok(())
    }

    /// Restarts every registered service.
    pub async fn restart_all_services(&self) {
        let registry = self.registry.lock().await;
        for wrapper in registry.values() {
            if wrapper.status() == ServiceState::Running {
                wrapper.stop_and_wait().await;
            }
            tokio::spawn(wrapper.clone().run());
        }
    }

    /// Point-in-time snapshot of the supervisor and all registered services.
    pub async fn status(&self) -> StatusSnapshot {
        let registry = self.registry.lock().await;
        StatusSnapshot {
            is_running: self.is_running(),
            services: registry
                .iter()
                .map(|(name, w)| (name.clone(), w.report()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::services::ServiceFn;

    fn idle_service(name: &'static str) -> ServiceRef {
        ServiceFn::arc(name, |term: CancellationToken| async move {
            term.cancelled().await;
            Ok(())
        })
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let sup = Supervisor::new(Config::default());
        sup.register_service(idle_service("a"), ServiceOptions::default())
            .await
            .unwrap();

        let err = sup
            .register_service(idle_service("a"), ServiceOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::ServiceAlreadyExists { .. }));

        let snap = sup.status().await;
        assert_eq!(snap.services.len(), 1);
    }

    #[tokio::test]
    async fn deregister_unknown_service_fails() {
        let sup = Supervisor::new(Config::default());
        let err = sup.deregister_service("ghost").await.unwrap_err();
        assert!(matches!(err, RuntimeError::ServiceNotFound { .. }));
    }

    #[tokio::test]
    async fn deregister_removes_the_wrapper() {
        let sup = Supervisor::new(Config::default());
        sup.register_service(idle_service("a"), ServiceOptions::default())
            .await
            .unwrap();
        sup.deregister_service("a").await.unwrap();
        assert!(sup.status().await.services.is_empty());
    }

    #[tokio::test]
    async fn boot_up_twice_is_rejected() {
        let sup = Supervisor::new(Config::default());
        let ctx = CancellationToken::new();

        let sup2 = sup.clone();
        let ctx2 = ctx.clone();
        let boot = tokio::spawn(async move { sup2.boot_up(ctx2).await });

        while !sup.is_running() {
            tokio::task::yield_now().await;
        }
        let err = sup.boot_up(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, RuntimeError::AlreadyRunning));

        ctx.cancel();
        boot.await.unwrap().unwrap();
        assert!(!sup.is_running());
    }
}
