#![cfg(unix)]

mod common;

use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;

use servisor::{Config, ServiceOptions, ServiceState, Supervisor};

/// Connects to the control socket, retrying while the listener comes up.
async fn connect_with_retry(path: &Path) -> UnixStream {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match UnixStream::connect(path).await {
            Ok(conn) => return conn,
            Err(e) => {
                assert!(Instant::now() < deadline, "could not connect: {e}");
                sleep(Duration::from_millis(20)).await;
            }
        }
    }
}

/// Sends one command line and returns the raw reply (up to EOF).
async fn send(path: &Path, line: &str) -> String {
    let mut conn = connect_with_retry(path).await;
    conn.write_all(format!("{line}\n").as_bytes())
        .await
        .expect("write command");
    let mut reply = String::new();
    conn.read_to_string(&mut reply).await.expect("read reply");
    reply
}

async fn wait_for_file(path: &Path) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !path.exists() {
        assert!(Instant::now() < deadline, "socket file never appeared");
        sleep(Duration::from_millis(20)).await;
    }
}

async fn wait_for_state(sup: &Supervisor, name: &str, state: ServiceState) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if sup.status().await.services[name].status == state {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "service {name} never reached {state}"
        );
        sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn command_round_trips_over_the_socket() {
    let path = common::unique_socket_path("roundtrip");
    let mut cfg = Config::default();
    cfg.socket = true;
    cfg.socket_path = path.clone();
    let sup = Supervisor::new(cfg);

    let (a, _runs) = common::obedient("a");
    sup.register_service(a, ServiceOptions::default())
        .await
        .unwrap();

    let ctx = CancellationToken::new();
    let boot = {
        let sup = sup.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move { sup.boot_up(ctx).await })
    };
    wait_for_file(&path).await;
    wait_for_state(&sup, "a", ServiceState::Running).await;

    // status: JSON object with exactly {status, result}, snapshot embedded.
    let reply = send(&path, "status").await;
    let json: serde_json::Value = serde_json::from_str(&reply).unwrap();
    let obj = json.as_object().unwrap();
    assert_eq!(obj.len(), 2);
    assert_eq!(obj["status"], "success");
    assert_eq!(obj["result"]["isRunning"], true);
    assert_eq!(obj["result"]["services"]["a"]["status"], "running");
    assert_eq!(obj["result"]["services"]["a"]["restarts"], 0);

    // Unknown commands fail without disturbing the supervisor.
    let reply = send(&path, "frobnicate").await;
    let json: serde_json::Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(json["status"], "failure");
    assert_eq!(json["result"], "unknown command: frobnicate");
    assert!(sup.is_running());

    // stop without arguments is a usage failure.
    let reply = send(&path, "stop").await;
    let json: serde_json::Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(json["status"], "failure");
    assert_eq!(json["result"], "no service name provided");

    // restart cycles the service and reports the spelled-out name list.
    let reply = send(&path, "restart a").await;
    let json: serde_json::Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["result"], "service(s) restarted successfully: [a]");
    wait_for_state(&sup, "a", ServiceState::Running).await;
    assert_eq!(sup.status().await.services["a"].restarts, 1);

    // stopAll parks every service in Stopped.
    let reply = send(&path, "stopAll").await;
    let json: serde_json::Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["result"], "All services stopped successfully");
    assert_eq!(sup.status().await.services["a"].status, ServiceState::Stopped);

    ctx.cancel();
    timeout(Duration::from_secs(10), boot)
        .await
        .expect("boot loop wedged")
        .unwrap()
        .unwrap();

    // Shutdown unlinks the socket file.
    assert!(!path.exists());
}

#[tokio::test]
async fn denied_peer_gets_dropped_without_reply() {
    let path = common::unique_socket_path("denied");
    let mut cfg = Config::default();
    cfg.socket = true;
    cfg.socket_path = path.clone();
    // No real peer can present this UID, so every connection is rejected.
    cfg.allowed_uids = vec![u32::MAX];
    let sup = Supervisor::new(cfg);

    let ctx = CancellationToken::new();
    let boot = {
        let sup = sup.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move { sup.boot_up(ctx).await })
    };
    wait_for_file(&path).await;

    // The server may drop us mid-write, so tolerate I/O errors; the
    // assertion is only that no reply ever arrives.
    let mut conn = connect_with_retry(&path).await;
    let _ = conn.write_all(b"status\n").await;
    let mut reply = String::new();
    let _ = conn.read_to_string(&mut reply).await;
    assert!(reply.is_empty(), "rejected peer must not receive a reply");

    ctx.cancel();
    timeout(Duration::from_secs(10), boot)
        .await
        .expect("boot loop wedged")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn stale_socket_file_is_replaced_on_boot() {
    let path = common::unique_socket_path("stale");
    std::fs::write(&path, b"stale").unwrap();

    let mut cfg = Config::default();
    cfg.socket = true;
    cfg.socket_path = path.clone();
    let sup = Supervisor::new(cfg);

    let ctx = CancellationToken::new();
    let boot = {
        let sup = sup.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move { sup.boot_up(ctx).await })
    };
    wait_for_file(&path).await;

    let reply = send(&path, "status").await;
    let json: serde_json::Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(json["status"], "success");

    ctx.cancel();
    timeout(Duration::from_secs(10), boot)
        .await
        .expect("boot loop wedged")
        .unwrap()
        .unwrap();
    assert!(!path.exists());
}
