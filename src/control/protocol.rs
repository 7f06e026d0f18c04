//! # Wire protocol of the control socket.
//!
//! Requests are a single text line: `<command>[ <arg>…]\n`. Replies are one
//! JSON object with exactly two fields, `status` and `result`:
//!
//! ```json
//! {"status": "success", "result": "service(s) restarted successfully: [a]"}
//! ```
//!
//! The `status` command embeds the supervisor snapshot as `result` instead of
//! a message string.

use serde::Serialize;

use crate::services::StatusSnapshot;

/// A parsed control command.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Command {
    StopAll,
    Stop(Vec<String>),
    RestartAll,
    Restart(Vec<String>),
    Status,
    Unknown(String),
}

impl Command {
    /// Parses one request line. Returns `None` for a blank line.
    pub(crate) fn parse(line: &str) -> Option<Command> {
        let mut parts = line.split_whitespace();
        let command = parts.next()?;
        let args: Vec<String> = parts.map(str::to_string).collect();

        Some(match command {
            "stopAll" => Command::StopAll,
            "stop" => Command::Stop(args),
            "restartAll" => Command::RestartAll,
            "restart" => Command::Restart(args),
            "status" => Command::Status,
            other => Command::Unknown(other.to_string()),
        })
    }
}

/// Outcome marker of a control command.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ReplyStatus {
    Success,
    Failure,
}

/// Reply payload: either a human-readable message or the status snapshot.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum ReplyBody {
    Message(String),
    Snapshot(StatusSnapshot),
}

/// The single JSON object written back for every request.
#[derive(Debug, Serialize)]
pub(crate) struct SocketReply {
    pub(crate) status: ReplyStatus,
    pub(crate) result: ReplyBody,
}

impl SocketReply {
    pub(crate) fn success(msg: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Success,
            result: ReplyBody::Message(msg.into()),
        }
    }

    pub(crate) fn failure(msg: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Failure,
            result: ReplyBody::Message(msg.into()),
        }
    }

    pub(crate) fn snapshot(snap: StatusSnapshot) -> Self {
        Self {
            status: ReplyStatus::Success,
            result: ReplyBody::Snapshot(snap),
        }
    }
}

/// Renders a name list the way replies spell it: `[a b]`.
pub(crate) fn format_names(names: &[String]) -> String {
    format!("[{}]", names.join(" "))
}
