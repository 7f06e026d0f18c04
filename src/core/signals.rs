//! Cross-platform OS signal handling utilities.
//!
//! A single async helper [`wait_for_shutdown_signal`] that completes when the
//! process receives a termination signal.
//!
//! ## Unix
//! The following signals are handled:
//! - **SIGTERM** (default kill signal, used by systemd/Kubernetes)
//! - **SIGINT** (Ctrl-C in terminal)
//! - **SIGQUIT** (hard-stop / core-dump signal)
//! - **SIGHUP** (terminal hangup)
//!
//! Additionally, [`tokio::signal::ctrl_c`] is awaited as a fallback.
//!
//! ## Windows
//! On non-Unix platforms only [`tokio::signal::ctrl_c`] is awaited.

#[cfg(unix)]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigquit = signal(SignalKind::quit())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigterm.recv() => {},
        _ = sigint.recv()  => {},
        _ = sigquit.recv() => {},
        _ = sighup.recv()  => {},
    }
    Ok(())
}

#[cfg(not(unix))]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
