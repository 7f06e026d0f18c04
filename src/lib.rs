//! # servisor
//!
//! **Servisor** is an embedded service lifecycle manager.
//!
//! It registers user-supplied long-running workers, starts them concurrently,
//! relaunches the ones that die (with an optional exponential backoff and a
//! retry cap), and coordinates a bounded graceful shutdown on OS signals. A
//! local unix control socket exposes stop/restart/status commands to the
//! `servisorctl` companion binary or any line-oriented client.
//!
//! ## Features
//!
//! | Area              | Description                                                        | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------------|---------------------------------------------|
//! | **Services**      | Define workers as trait objects or closures.                       | [`Service`], [`ServiceFn`], [`ServiceRef`]  |
//! | **Hooks**         | Best-effort side-effects around each run.                          | [`Hook`], [`HookFn`]                        |
//! | **Auto-restart**  | Relaunch exited services with capped exponential backoff.          | [`AutoRestartOptions`]                      |
//! | **Supervision**   | Registry, reconciliation loop, bounded shutdown.                   | [`Supervisor`]                              |
//! | **Control plane** | Local socket: `stopAll`, `stop`, `restartAll`, `restart`, `status`.| [`Config`], [`StatusSnapshot`]              |
//! | **Errors**        | Typed errors for the engine, services, and hooks.                  | [`RuntimeError`], [`ServiceError`]          |
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use servisor::{Config, ServiceFn, ServiceOptions, Supervisor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default();
//!     cfg.socket = true;
//!
//!     let sup = Supervisor::new(cfg);
//!
//!     let worker = ServiceFn::arc("worker", |term: CancellationToken| async move {
//!         // do work until asked to stop...
//!         term.cancelled().await;
//!         Ok(())
//!     });
//!     sup.register_service(worker, ServiceOptions::default()).await?;
//!
//!     // Blocks until SIGTERM/SIGINT/SIGQUIT/SIGHUP or the token fires.
//!     sup.boot_up(CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ---

mod config;
#[cfg(unix)]
mod control;
mod core;
mod error;
mod hooks;
mod services;

// ---- Public re-exports ----

pub use crate::config::{Config, DEFAULT_SHUTDOWN_TIMEOUT, DEFAULT_SOCKET_PATH};
pub use crate::core::Supervisor;
pub use crate::error::{HookError, RuntimeError, ServiceError};
pub use crate::hooks::{Hook, HookFn, HookRef};
pub use crate::services::{
    AutoRestartOptions, ScheduleOptions, Service, ServiceFn, ServiceOptions, ServiceRef,
    ServiceReport, ServiceState, StatusSnapshot,
};
