#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use servisor::{ServiceFn, ServiceRef};

/// A well-behaved service: runs until its termination token fires.
/// Returns the service and a counter of how many times it was started.
pub fn obedient(name: &'static str) -> (ServiceRef, Arc<AtomicUsize>) {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let svc = ServiceFn::arc(name, move |term: CancellationToken| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            term.cancelled().await;
            Ok(())
        }
    });
    (svc, runs)
}

/// A service that exits on its own after `lifetime`, ignoring stop requests.
pub fn one_shot(name: &'static str, lifetime: Duration) -> (ServiceRef, Arc<AtomicUsize>) {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let svc = ServiceFn::arc(name, move |_term: CancellationToken| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            if !lifetime.is_zero() {
                tokio::time::sleep(lifetime).await;
            }
            Ok(())
        }
    });
    (svc, runs)
}

/// A misbehaving service: ignores its termination token and naps for `nap`.
pub fn stubborn(name: &'static str, nap: Duration) -> ServiceRef {
    ServiceFn::arc(name, move |_term: CancellationToken| async move {
        tokio::time::sleep(nap).await;
        Ok(())
    })
}

/// A socket path unique to this test process and tag.
pub fn unique_socket_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("servisor-test-{}-{}.sock", tag, std::process::id()))
}
