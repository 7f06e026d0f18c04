//! # Per-registration service options.
//!
//! [`ServiceOptions`] travels with a service into the registry and is
//! immutable afterwards: lifecycle hooks, the auto-restart policy, and the
//! reserved scheduling block.

use std::time::Duration;

use crate::hooks::HookRef;

/// Default cap on consecutive auto-restart attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Default base for the exponential backoff delay.
pub const DEFAULT_BACKOFF_EXPONENT: u32 = 2;

/// Options attached to a service at registration time.
#[derive(Clone, Default)]
pub struct ServiceOptions {
    /// Hooks executed, in order, before each service start.
    pub pre_hooks: Vec<HookRef>,
    /// Hooks executed, in order, after each service return.
    pub post_hooks: Vec<HookRef>,
    /// Auto-restart policy applied when the service exits on its own.
    pub auto_restart: AutoRestartOptions,
    /// Reserved scheduling block. Stored for forward compatibility; the
    /// engine never evaluates it.
    pub schedule: ScheduleOptions,
}

impl ServiceOptions {
    /// Fills zero fields of the auto-restart policy with their defaults.
    pub fn sanitize(&mut self) {
        if self.auto_restart.max_retries == 0 {
            log::warn!(
                "max_retries not set, using default {}",
                DEFAULT_MAX_RETRIES
            );
            self.auto_restart.max_retries = DEFAULT_MAX_RETRIES;
        }

        if self.auto_restart.backoff_exponent == 0 {
            log::warn!(
                "backoff_exponent not set, using default {}",
                DEFAULT_BACKOFF_EXPONENT
            );
            self.auto_restart.backoff_exponent = DEFAULT_BACKOFF_EXPONENT;
        }
    }
}

/// Auto-restart policy for a service that exits on its own.
///
/// A service stopped by the supervisor (status `stopped`) is never
/// auto-restarted; the policy applies to `exited` services only.
#[derive(Clone, Copy, Debug, Default)]
pub struct AutoRestartOptions {
    /// Whether exited services are relaunched at all.
    pub enabled: bool,
    /// Maximum number of consecutive relaunches before `exhausted`.
    pub max_retries: u32,
    /// Whether relaunches are delayed by an exponential backoff.
    pub backoff: bool,
    /// Base of the backoff: delay = `backoff_exponent ^ retry_count` seconds.
    pub backoff_exponent: u32,
}

/// Reserved scheduling options.
///
/// Accepted and stored so registrations written against a future scheduler
/// keep working, but no loop consumes them.
#[derive(Clone, Debug, Default)]
pub struct ScheduleOptions {
    /// Whether scheduled execution is requested.
    pub enabled: bool,
    /// Cron expression for the schedule.
    pub cron: String,
    /// Per-run execution timeout.
    pub timeout: Duration,
    /// Maximum number of scheduled runs.
    pub max_runs: u32,
}
