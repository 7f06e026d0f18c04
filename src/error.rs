//! # Error types used by the supervisor and its collaborators.
//!
//! Three error enums, split by who produces them:
//!
//! - [`RuntimeError`] errors raised by the supervisor itself (registration,
//!   lifecycle, control-socket transport).
//! - [`ServiceError`] errors returned by individual service runs.
//! - [`HookError`] failures of pre/post lifecycle hooks.
//!
//! [`RuntimeError`] provides `as_label` for stable log/metric labels.

use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the supervisor runtime.
///
/// These represent failures of the supervision engine and its control plane,
/// not of the user services it manages.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Attempted to boot a supervisor that is already running.
    #[error("supervisor is already running")]
    AlreadyRunning,

    /// Attempted to register a service under a name that is already taken.
    #[error("service '{name}' already exists in registry")]
    ServiceAlreadyExists {
        /// The duplicate service name.
        name: String,
    },

    /// Attempted to deregister a service that was never registered.
    #[error("service '{name}' not found in registry")]
    ServiceNotFound {
        /// The missing service name.
        name: String,
    },

    /// Stop was requested for a service that is not running.
    #[error("service '{name}' is not running")]
    ServiceNotRunning {
        /// The idle service name.
        name: String,
    },

    /// Graceful shutdown exceeded its budget; some services were abandoned.
    #[error("shutdown timeout {timeout:?} exceeded; abandoning {stuck:?}")]
    ShutdownTimeout {
        /// The configured shutdown budget.
        timeout: Duration,
        /// Names of services that did not stop in time.
        stuck: Vec<String>,
    },

    /// Control-socket setup or I/O failure.
    #[error("control socket: {reason}")]
    Socket {
        /// Human-readable description of the transport failure.
        reason: String,
        #[source]
        source: std::io::Error,
    },

    /// Peer UID is not in the control-socket allow-list.
    #[error("access denied for uid {uid}")]
    AccessDenied {
        /// The rejected peer UID.
        uid: u32,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::AlreadyRunning => "supervisor_already_running",
            RuntimeError::ServiceAlreadyExists { .. } => "service_already_exists",
            RuntimeError::ServiceNotFound { .. } => "service_not_found",
            RuntimeError::ServiceNotRunning { .. } => "service_not_running",
            RuntimeError::ShutdownTimeout { .. } => "shutdown_timeout",
            RuntimeError::Socket { .. } => "socket_error",
            RuntimeError::AccessDenied { .. } => "access_denied",
        }
    }

    pub(crate) fn socket(reason: impl Into<String>, source: std::io::Error) -> Self {
        RuntimeError::Socket {
            reason: reason.into(),
            source,
        }
    }
}

/// # Errors produced by a service run.
///
/// The supervisor does not interpret these beyond logging: a service that
/// returns an error and one that returns `Ok` both end the run in `Exited`
/// (or `Stopped`, if the stop was requested by the supervisor).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The service body failed.
    #[error("service failed: {reason}")]
    Failed { reason: String },

    /// The service observed its termination token and bailed out early.
    ///
    /// Not an error in the traditional sense; signals intentional exit.
    #[error("service canceled")]
    Canceled,
}

impl ServiceError {
    /// Convenience constructor for ad-hoc failure reasons.
    pub fn failed(reason: impl Into<String>) -> Self {
        ServiceError::Failed {
            reason: reason.into(),
        }
    }
}

/// Failure of a pre- or post-run hook. Logged by the wrapper and swallowed.
#[derive(Error, Debug)]
#[error("hook failed: {reason}")]
pub struct HookError {
    pub reason: String,
}

impl HookError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
