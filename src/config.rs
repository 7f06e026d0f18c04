//! # Supervisor configuration.
//!
//! [`Config`] defines the supervisor's behavior: control-socket exposure,
//! peer-UID access control, and the graceful-shutdown budget.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use servisor::Config;
//!
//! let mut cfg = Config::default();
//! cfg.socket = true;
//! cfg.shutdown_timeout = Duration::from_secs(10);
//!
//! assert_eq!(cfg.socket_path, std::path::PathBuf::from("/tmp/servisor.sock"));
//! ```

use std::path::PathBuf;
use std::time::Duration;

/// Default location of the control socket.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/servisor.sock";

/// Default graceful-shutdown budget.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Global configuration for the supervisor.
///
/// Controls the control socket, who may talk to it, and how long shutdown
/// waits for services before abandoning them.
#[derive(Clone, Debug)]
pub struct Config {
    /// Whether to expose the local control socket.
    pub socket: bool,
    /// Filesystem path of the control socket.
    pub socket_path: PathBuf,
    /// Peer UIDs allowed to use the socket. Empty = unrestricted.
    pub allowed_uids: Vec<u32>,
    /// Maximum time to wait for services during graceful shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `socket = false`
    /// - `socket_path = /tmp/servisor.sock`
    /// - `allowed_uids = []` (unrestricted)
    /// - `shutdown_timeout = 30s`
    fn default() -> Self {
        Self {
            socket: false,
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            allowed_uids: Vec::new(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl Config {
    /// Fills zero/empty fields with their defaults.
    ///
    /// Called once when the supervisor is created, so a partially-filled
    /// config never leaves the engine without a socket path or a shutdown
    /// budget.
    pub fn sanitize(&mut self) {
        if self.shutdown_timeout.is_zero() {
            log::warn!(
                "shutdown timeout not set, using default {:?}",
                DEFAULT_SHUTDOWN_TIMEOUT
            );
            self.shutdown_timeout = DEFAULT_SHUTDOWN_TIMEOUT;
        }

        if self.socket_path.as_os_str().is_empty() {
            log::warn!(
                "socket path not set, using default {}",
                DEFAULT_SOCKET_PATH
            );
            self.socket_path = PathBuf::from(DEFAULT_SOCKET_PATH);
        }
    }
}
