//! Thin command-line client for the servisor control socket.
//!
//! Sends one line-oriented command per invocation and renders the JSON reply:
//! the status snapshot as an aligned table, everything else as the result
//! message. Exits non-zero on transport failures and failure replies.

#[cfg(unix)]
fn main() -> anyhow::Result<()> {
    unix::run()
}

#[cfg(not(unix))]
fn main() {
    eprintln!("servisorctl requires unix domain sockets");
    std::process::exit(1);
}

#[cfg(unix)]
mod unix {
    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;
    use std::path::{Path, PathBuf};

    use anyhow::{bail, Context};
    use clap::{Parser, Subcommand};
    use serde_json::Value;

    use servisor::{StatusSnapshot, DEFAULT_SOCKET_PATH};

    #[derive(Parser)]
    #[command(
        name = "servisorctl",
        about = "Command line tool to interact with the servisor control socket"
    )]
    struct Cli {
        /// Path to the control socket.
        #[arg(long, global = true, default_value = DEFAULT_SOCKET_PATH)]
        socket: PathBuf,

        #[command(subcommand)]
        command: CliCommand,
    }

    #[derive(Subcommand)]
    enum CliCommand {
        /// Stop all services.
        #[command(name = "stopAll")]
        StopAll,
        /// Stop the given list of services.
        #[command(name = "stop")]
        Stop {
            /// Comma-separated list of services to stop.
            #[arg(long, value_delimiter = ',', required = true)]
            services: Vec<String>,
        },
        /// Restart all services.
        #[command(name = "restartAll")]
        RestartAll,
        /// Restart the given list of services.
        #[command(name = "restart")]
        Restart {
            /// Comma-separated list of services to restart.
            #[arg(long, value_delimiter = ',', required = true)]
            services: Vec<String>,
        },
        /// Show the status of the supervisor and every service.
        #[command(name = "status")]
        Status,
    }

    pub(super) fn run() -> anyhow::Result<()> {
        let cli = Cli::parse();

        let line = match &cli.command {
            CliCommand::StopAll => "stopAll".to_string(),
            CliCommand::Stop { services } => format!("stop {}", services.join(" ")),
            CliCommand::RestartAll => "restartAll".to_string(),
            CliCommand::Restart { services } => format!("restart {}", services.join(" ")),
            CliCommand::Status => "status".to_string(),
        };

        let reply = send(&cli.socket, &line)?;
        let status = reply
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let result = reply.get("result").cloned().unwrap_or(Value::Null);

        if status != "success" {
            bail!("{}", as_message(&result));
        }

        match cli.command {
            CliCommand::Status => render_status(result)?,
            _ => println!("{}", as_message(&result)),
        }
        Ok(())
    }

    fn send(path: &Path, line: &str) -> anyhow::Result<Value> {
        let mut conn = UnixStream::connect(path)
            .with_context(|| format!("connect to socket {}", path.display()))?;

        conn.write_all(format!("{line}\n").as_bytes())
            .context("write to socket")?;

        // The server replies once and closes the connection.
        let mut buf = String::new();
        conn.read_to_string(&mut buf).context("read response")?;

        serde_json::from_str(&buf).context("decode response")
    }

    fn as_message(result: &Value) -> String {
        match result {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn render_status(result: Value) -> anyhow::Result<()> {
        let snapshot: StatusSnapshot =
            serde_json::from_value(result).context("decode status snapshot")?;

        println!("supervisor running: {}", snapshot.is_running);
        if snapshot.services.is_empty() {
            return Ok(());
        }

        let mut names: Vec<&String> = snapshot.services.keys().collect();
        names.sort();

        let width = names.iter().map(|n| n.len()).max().unwrap_or(0).max(7);
        println!("{:<width$}  {:<21}  {:>8}  {:>8}", "SERVICE", "STATUS", "UPTIME", "RESTARTS");
        for name in names {
            let report = &snapshot.services[name];
            println!(
                "{:<width$}  {:<21}  {:>7}s  {:>8}",
                name,
                report.status.to_string(),
                report.uptime.as_secs(),
                report.restarts,
            );
        }
        Ok(())
    }
}
