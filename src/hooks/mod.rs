//! # Lifecycle hooks.
//!
//! A [`Hook`] is a named side-effect executed around a service run: pre-hooks
//! before the service starts, post-hooks after it returns. Hook failures are
//! logged by the wrapper and never abort the run; hooks are never retried.
//!
//! [`HookFn`] wraps a closure into a hook; [`HookRef`] is the shared handle
//! stored in service options.

use std::{borrow::Cow, future::Future, sync::Mutex};

use async_trait::async_trait;

use crate::error::HookError;

/// Shared handle to a hook object.
pub type HookRef = std::sync::Arc<dyn Hook>;

/// # Named, best-effort side-effect run around a service.
///
/// Implementations should be idempotent on failure: the supervisor logs a
/// returned error and carries on with the run.
#[async_trait]
pub trait Hook: Send + Sync + 'static {
    /// Returns a stable, human-readable hook name.
    fn name(&self) -> &str;

    /// Executes the hook.
    async fn execute(&self) -> Result<(), HookError>;
}

/// # Function-backed hook implementation.
///
/// Wraps a closure `Fnc: FnMut() -> Fut`. The closure is protected by a
/// [`Mutex`] so `execute(&self)` can be called repeatedly even though the
/// closure is `FnMut`; the mutex is held only while the future is created,
/// not while it runs.
///
/// # Example
/// ```
/// use servisor::{HookFn, HookRef};
///
/// let h: HookRef = HookFn::arc("warm-cache", || async { Ok(()) });
/// assert_eq!(h.name(), "warm-cache");
/// ```
pub struct HookFn<Fnc, Fut>
where
    Fnc: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), HookError>> + Send + 'static,
{
    name: Cow<'static, str>,
    func: Mutex<Fnc>,
}

impl<Fnc, Fut> HookFn<Fnc, Fut>
where
    Fnc: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), HookError>> + Send + 'static,
{
    /// Creates a new function-backed hook.
    pub fn new(name: impl Into<Cow<'static, str>>, func: Fnc) -> Self {
        Self {
            name: name.into(),
            func: Mutex::new(func),
        }
    }

    /// Creates the hook and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, func: Fnc) -> HookRef {
        std::sync::Arc::new(Self::new(name, func))
    }
}

#[async_trait]
impl<Fnc, Fut> Hook for HookFn<Fnc, Fut>
where
    Fnc: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), HookError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self) -> Result<(), HookError> {
        let fut = {
            let mut f = self
                .func
                .lock()
                .map_err(|_| HookError::new("hook mutex poisoned"))?;
            (f)()
        };
        fut.await
    }
}
