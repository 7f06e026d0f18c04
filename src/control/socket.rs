//! # Control socket server.
//!
//! A unix stream socket that accepts one command per connection and answers
//! with a single JSON reply. Binding removes any stale socket file and sets
//! mode `0600`; shutdown drops the listener and unlinks the file.
//!
//! When a peer-UID allow-list is configured, each accepted connection's
//! `SO_PEERCRED` credentials are checked before the request is read; rejected
//! peers are dropped with a logged error. An empty allow-list means
//! unrestricted access.

use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Weak;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;

use crate::control::protocol::{format_names, Command, SocketReply};
use crate::core::Supervisor;
use crate::error::RuntimeError;

/// Pause after a failed accept before trying again.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Accept loop state for the control socket.
pub(crate) struct ControlSocket {
    supervisor: Weak<Supervisor>,
    path: PathBuf,
    allowed_uids: Vec<u32>,
}

impl ControlSocket {
    pub(crate) fn new(supervisor: Weak<Supervisor>, path: PathBuf, allowed_uids: Vec<u32>) -> Self {
        Self {
            supervisor,
            path,
            allowed_uids,
        }
    }

    /// Runs the accept loop until `shutdown` is cancelled, then unlinks the
    /// socket file.
    pub(crate) async fn serve(self, shutdown: CancellationToken) {
        let listener = match self.bind() {
            Ok(l) => l,
            Err(e) => {
                log::error!("starting control socket: {e}");
                return;
            }
        };

        log::info!(
            "listening on {}, permitted access for uids: {:?}",
            self.path.display(),
            self.allowed_uids
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        let supervisor = self.supervisor.clone();
                        let allowed = self.allowed_uids.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(supervisor, &allowed, stream).await {
                                log::error!("handling control connection: {e}");
                            }
                        });
                    }
                    Err(e) => {
                        log::error!("accepting connection: {e}");
                        tokio::select! {
                            _ = shutdown.cancelled() => break,
                            _ = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => {}
                        }
                    }
                }
            }
        }

        log::info!("closing the control socket listener");
        drop(listener);

        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                log::error!("removing socket file: {e}");
            }
        }
        log::info!("control socket closed and file removed");
    }

    fn bind(&self) -> Result<UnixListener, RuntimeError> {
        if self.path.exists() {
            log::warn!("removing existing socket file {}", self.path.display());
            if let Err(e) = std::fs::remove_file(&self.path) {
                log::error!("removing stale socket file: {e}");
            }
        }

        let listener = UnixListener::bind(&self.path)
            .map_err(|e| RuntimeError::socket("creating socket listener", e))?;

        std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| RuntimeError::socket("setting socket file permissions", e))?;

        Ok(listener)
    }
}

/// Serves one connection: authorize, read one line, dispatch, reply.
async fn handle_connection(
    supervisor: Weak<Supervisor>,
    allowed_uids: &[u32],
    stream: UnixStream,
) -> Result<(), RuntimeError> {
    authorize(&stream, allowed_uids)?;

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .await
        .map_err(|e| RuntimeError::socket("reading request", e))?;

    let Some(command) = Command::parse(&line) else {
        return Err(RuntimeError::socket(
            "empty request",
            io::Error::new(io::ErrorKind::InvalidData, "empty request line"),
        ));
    };

    log::info!("received control command: {command:?}");

    let reply = match supervisor.upgrade() {
        Some(sup) => dispatch(&sup, command).await,
        None => SocketReply::failure("supervisor is gone"),
    };

    let payload = serde_json::to_vec(&reply)
        .map_err(|e| RuntimeError::socket("encoding reply", e.into()))?;

    let mut stream = reader.into_inner();
    stream
        .write_all(&payload)
        .await
        .map_err(|e| RuntimeError::socket("writing reply", e))?;

    Ok(())
}

/// Maps a command onto the supervisor's public operations.
async fn dispatch(sup: &Supervisor, command: Command) -> SocketReply {
    match command {
        Command::StopAll => {
            sup.stop_all_services().await;
            SocketReply::success("All services stopped successfully")
        }
        Command::Stop(names) => {
            if names.is_empty() {
                return SocketReply::failure("no service name provided");
            }
            match sup.stop_service(&names).await {
                Ok(()) => SocketReply::success(format!(
                    "service(s) stopped successfully: {}",
                    format_names(&names)
                )),
                Err(e) => SocketReply::failure(format!(
                    "failed to stop service(s)- {}: {e}",
                    format_names(&names)
                )),
            }
        }
        Command::RestartAll => {
            sup.restart_all_services().await;
            SocketReply::success("All services restarted successfully")
        }
        Command::Restart(names) => {
            if names.is_empty() {
                return SocketReply::failure("no service name provided");
            }
            match sup.restart_service(&names).await {
                Ok(()) => SocketReply::success(format!(
                    "service(s) restarted successfully: {}",
                    format_names(&names)
                )),
                Err(e) => SocketReply::failure(format!(
                    "failed to restart service(s)- {}: {e}",
                    format_names(&names)
                )),
            }
        }
        Command::Status => SocketReply::snapshot(sup.status().await),
        Command::Unknown(c) => SocketReply::failure(format!("unknown command: {c}")),
    }
}

/// Rejects peers whose UID is not in the allow-list. Empty list = open.
fn authorize(stream: &UnixStream, allowed_uids: &[u32]) -> Result<(), RuntimeError> {
    if allowed_uids.is_empty() {
        return Ok(());
    }

    let cred = stream
        .peer_cred()
        .map_err(|e| RuntimeError::socket("getting peer credentials", e))?;

    if allowed_uids.contains(&cred.uid()) {
        Ok(())
    } else {
        Err(RuntimeError::AccessDenied { uid: cred.uid() })
    }
}
