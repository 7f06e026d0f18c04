//! # Public service states and the status snapshot.
//!
//! [`ServiceState`] is the wrapper's externally visible lifecycle state; the
//! wire spelling (lowercase, `scheduled-for-restart`) is fixed by the control
//! protocol. [`StatusSnapshot`] is the `status` command's payload.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a registered service.
///
/// `Scheduled` and `ScheduledForRestart` are reserved for a future scheduler
/// and are never produced by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceState {
    /// Registered but not yet launched by the reconciler.
    Registered,
    /// Exactly one task is executing the service body.
    Running,
    /// The service returned on its own; auto-restart may apply.
    Exited,
    /// The service returned after the supervisor requested a stop.
    Stopped,
    /// Auto-restart retries are used up; the service is never relaunched.
    Exhausted,
    /// Reserved.
    Scheduled,
    /// Reserved.
    ScheduledForRestart,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceState::Registered => "registered",
            ServiceState::Running => "running",
            ServiceState::Exited => "exited",
            ServiceState::Stopped => "stopped",
            ServiceState::Exhausted => "exhausted",
            ServiceState::Scheduled => "scheduled",
            ServiceState::ScheduledForRestart => "scheduled-for-restart",
        };
        f.write_str(s)
    }
}

/// Point-in-time report for one service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceReport {
    /// Current lifecycle state.
    pub status: ServiceState,
    /// Time since the current run started; zero when not running.
    pub uptime: Duration,
    /// Completed relaunches (total starts minus one).
    pub restarts: u64,
}

/// Snapshot of the supervisor and every registered service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Whether the supervisor's boot loop is active.
    #[serde(rename = "isRunning")]
    pub is_running: bool,
    /// Per-service reports, keyed by service name.
    pub services: HashMap<String, ServiceReport>,
}
