//! # Reconciler: the periodic sweep that enforces desired state.
//!
//! Runs once per tick while the supervisor holds the registry lock. The sweep
//! itself never awaits; every launch is dispatched to its own task:
//!
//! - `Registered` wrappers are launched.
//! - Wrappers with a relaunch already in flight (`pending_start`) are skipped.
//! - `Exited` wrappers with auto-restart enabled are relaunched after an
//!   optional exponential backoff, until their retry budget is spent and they
//!   become `Exhausted`.
//!
//! A stale status read is safe: the next tick observes the corrected state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::core::wrapper::Wrapper;
use crate::services::ServiceState;

/// Period of the reconciliation sweep.
pub(crate) const RECONCILE_INTERVAL: Duration = Duration::from_secs(1);

/// One sweep over the registry. Caller holds the registry lock.
pub(crate) fn reconcile(registry: &HashMap<String, Arc<Wrapper>>) {
    for w in registry.values() {
        // First sweep after boot: launch everything still in Registered.
        if w.status() == ServiceState::Registered {
            tokio::spawn(w.clone().run());
            continue;
        }

        // A backoff task already owns this wrapper's next launch.
        if w.pending_start() {
            continue;
        }

        // Services stopped by the supervisor stay stopped; only self-exited
        // services are relaunched.
        let policy = w.restart_policy();
        if w.status() == ServiceState::Exited && policy.enabled {
            if w.retry_count() >= policy.max_retries {
                log::info!("service {} reached max retries, not restarting", w.name());
                w.mark_exhausted();
                continue;
            }

            let delay = if policy.backoff {
                backoff_delay(policy.backoff_exponent, w.retry_count())
            } else {
                Duration::ZERO
            };

            w.begin_retry();

            let w = w.clone();
            tokio::spawn(async move {
                if !delay.is_zero() {
                    log::info!("service {} backing off, restarting in {delay:?}", w.name());
                    tokio::time::sleep(delay).await;
                }
                w.run().await;
            });
        }
    }
}

/// `exponent ^ retry_count` seconds, saturating on overflow.
fn backoff_delay(exponent: u32, retry_count: u32) -> Duration {
    let secs = (exponent as u64)
        .checked_pow(retry_count)
        .unwrap_or(u64::MAX);
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::time::{advance, sleep};
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::services::{AutoRestartOptions, ServiceFn, ServiceOptions, ServiceRef};

    fn one_shot(name: &'static str, runs: Arc<AtomicUsize>) -> ServiceRef {
        ServiceFn::arc(name, move |_term: CancellationToken| {
            let runs = runs.clone();
            async move {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    fn registry_of(w: Arc<Wrapper>) -> HashMap<String, Arc<Wrapper>> {
        let mut m = HashMap::new();
        m.insert(w.name().to_string(), w);
        m
    }

    async fn settle() {
        // Let spawned launch tasks make progress under the paused clock.
        sleep(Duration::from_millis(1)).await;
    }

    #[test]
    fn backoff_delay_grows_exponentially() {
        assert_eq!(backoff_delay(2, 0), Duration::from_secs(1));
        assert_eq!(backoff_delay(2, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2, 3), Duration::from_secs(8));
        assert_eq!(backoff_delay(3, 2), Duration::from_secs(9));
        // Saturates instead of overflowing.
        assert_eq!(backoff_delay(u32::MAX, u32::MAX), Duration::from_secs(u64::MAX));
    }

    #[tokio::test(start_paused = true)]
    async fn registered_wrapper_is_launched() {
        let runs = Arc::new(AtomicUsize::new(0));
        let w = Arc::new(Wrapper::new(
            one_shot("fresh", runs.clone()),
            ServiceOptions::default(),
        ));
        let reg = registry_of(w.clone());

        reconcile(&reg);
        settle().await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(w.status(), ServiceState::Exited);
    }

    #[tokio::test(start_paused = true)]
    async fn exited_wrapper_restarts_until_exhausted() {
        let runs = Arc::new(AtomicUsize::new(0));
        let opts = ServiceOptions {
            auto_restart: AutoRestartOptions {
                enabled: true,
                max_retries: 2,
                backoff: false,
                backoff_exponent: 2,
            },
            ..Default::default()
        };
        let w = Arc::new(Wrapper::new(one_shot("flappy", runs.clone()), opts));
        let reg = registry_of(w.clone());

        // Launch, then two immediate relaunches, then exhaustion.
        for _ in 0..5 {
            reconcile(&reg);
            settle().await;
        }

        assert_eq!(w.status(), ServiceState::Exhausted);
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(w.retry_count(), 2);

        // Exhausted is terminal: further sweeps change nothing.
        reconcile(&reg);
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(w.status(), ServiceState::Exhausted);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_defers_the_relaunch() {
        let runs = Arc::new(AtomicUsize::new(0));
        let opts = ServiceOptions {
            auto_restart: AutoRestartOptions {
                enabled: true,
                max_retries: 5,
                backoff: true,
                backoff_exponent: 2,
            },
            ..Default::default()
        };
        let w = Arc::new(Wrapper::new(one_shot("delayed", runs.clone()), opts));
        let reg = registry_of(w.clone());

        reconcile(&reg);
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // First retry is scheduled with delay 2^0 = 1s.
        reconcile(&reg);
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(w.pending_start());

        // While the backoff sleep is in flight, sweeps must not claim
        // another retry.
        reconcile(&reg);
        assert_eq!(w.retry_count(), 1);

        advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        // Second retry backs off 2^1 = 2s.
        reconcile(&reg);
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        advance(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
