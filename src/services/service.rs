//! # Service abstraction and function-backed implementation.
//!
//! This module defines the [`Service`] trait (async, cancelable) and the
//! closure-backed [`ServiceFn`]. The common handle type is [`ServiceRef`],
//! an `Arc<dyn Service>` suitable for sharing with the supervisor.
//!
//! A service receives a [`CancellationToken`] — its only capability for
//! observing stop requests — and should exit promptly once the token is
//! cancelled. The supervisor never inspects a service beyond its name and
//! its lifecycle signals.

use std::{borrow::Cow, future::Future, sync::Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;

/// Shared handle to a service object.
///
/// This is the primary type used by registration and the wrapper.
pub type ServiceRef = std::sync::Arc<dyn Service>;

/// # User-supplied long-running worker.
///
/// A `Service` has a stable [`name`](Service::name) — unique within one
/// supervisor — and an async [`start`](Service::start) entry point that runs
/// until the termination token is cancelled or the worker finishes on its own.
///
/// Returning an error does not change lifecycle handling: the run ends in
/// `Exited` either way (or `Stopped` when the supervisor requested the stop),
/// and the auto-restart policy applies.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use servisor::{Service, ServiceError};
///
/// struct Demo;
///
/// #[async_trait]
/// impl Service for Demo {
///     fn name(&self) -> &str { "demo" }
///
///     async fn start(&self, term: CancellationToken) -> Result<(), ServiceError> {
///         term.cancelled().await;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Returns the stable, unique service name.
    fn name(&self) -> &str;

    /// Runs the worker until `term` is cancelled or the work is done.
    ///
    /// Implementations should select on `term.cancelled()` and exit quickly
    /// to honor graceful shutdown.
    async fn start(&self, term: CancellationToken) -> Result<(), ServiceError>;
}

/// # Function-backed service implementation.
///
/// Wraps a closure `Fnc: FnMut(CancellationToken) -> Fut`. The closure is
/// guarded by a [`Mutex`] so `start(&self, ...)` can be invoked across
/// restarts; the mutex is held only while the future is created, never while
/// it executes.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use servisor::{ServiceFn, ServiceRef, ServiceError};
///
/// let s: ServiceRef = ServiceFn::arc("worker", |term: CancellationToken| async move {
///     term.cancelled().await;
///     Ok::<_, ServiceError>(())
/// });
///
/// assert_eq!(s.name(), "worker");
/// ```
pub struct ServiceFn<Fnc, Fut>
where
    Fnc: FnMut(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
{
    /// Stable service name.
    name: Cow<'static, str>,
    /// Underlying function (guarded to allow `FnMut` with `&self`).
    func: Mutex<Fnc>,
}

impl<Fnc, Fut> ServiceFn<Fnc, Fut>
where
    Fnc: FnMut(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
{
    /// Creates a new function-backed service.
    ///
    /// Prefer [`ServiceFn::arc`] when you immediately need a [`ServiceRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, func: Fnc) -> Self {
        Self {
            name: name.into(),
            func: Mutex::new(func),
        }
    }

    /// Creates the service and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, func: Fnc) -> ServiceRef {
        std::sync::Arc::new(Self::new(name, func))
    }
}

#[async_trait]
impl<Fnc, Fut> Service for ServiceFn<Fnc, Fut>
where
    Fnc: FnMut(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, term: CancellationToken) -> Result<(), ServiceError> {
        let fut = {
            let mut f = self
                .func
                .lock()
                .map_err(|_| ServiceError::failed("service mutex poisoned"))?;
            (f)(term)
        };
        fut.await
    }
}
