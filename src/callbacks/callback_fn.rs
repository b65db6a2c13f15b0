//! # Function-backed callbacks (`CallbackFn`, `SyncFn`)
//!
//! [`CallbackFn`] wraps a closure `F: Fn(Scope) -> Fut`, producing a fresh
//! future per call. [`SyncFn`] wraps a plain `Fn(&Scope) -> Result<Value, _>`
//! for hooks and checkers that never await.
//!
//! ## Concurrency semantics
//! - Every call creates a **new** future that owns its own scope.
//! - No hidden mutation between calls; if shared state is needed use `Arc<...>`
//!   explicitly inside the closure.
//!
//! ## Example
//! ```rust
//! use storyvisor::{CallbackError, CallbackFn, CallbackRef, Scope, SyncFn};
//! use serde_json::json;
//!
//! let fetch: CallbackRef = CallbackFn::arc("fetch", |scope: Scope| async move {
//!     let user: String = scope.get("user")?;
//!     Ok::<_, CallbackError>(json!({ "user": user, "status": 200 }))
//! });
//! let check: CallbackRef = SyncFn::arc("check", |scope| {
//!     Ok(json!(scope.result().is_some()))
//! });
//!
//! assert_eq!(fetch.name(), "fetch");
//! assert_eq!(check.name(), "check");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use crate::callbacks::callback::{BoxCallbackFuture, Callback};
use crate::error::CallbackError;
use crate::values::{Scope, Value};

/// Async function-backed callback.
///
/// Wraps a closure that *creates* a new future per call.
#[derive(Debug)]
pub struct CallbackFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F, Fut> CallbackFn<F>
where
    F: Fn(Scope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, CallbackError>> + Send + 'static,
{
    /// Creates a new function-backed callback.
    ///
    /// Prefer [`CallbackFn::arc`] when you immediately need a [`CallbackRef`](crate::CallbackRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the callback and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut> Callback for CallbackFn<F>
where
    F: Fn(Scope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, CallbackError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, scope: Scope) -> BoxCallbackFuture {
        Box::pin((self.f)(scope))
    }
}

/// Synchronous function-backed callback.
///
/// The closure runs when the returned future is first polled, so a timed-out
/// boot phase that never reached it does not run it either.
#[derive(Debug)]
pub struct SyncFn<F> {
    name: Cow<'static, str>,
    f: Arc<F>,
}

impl<F> SyncFn<F>
where
    F: Fn(&Scope) -> Result<Value, CallbackError> + Send + Sync + 'static,
{
    /// Creates a new synchronous callback.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f: Arc::new(f),
        }
    }

    /// Creates the callback and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F> Callback for SyncFn<F>
where
    F: Fn(&Scope) -> Result<Value, CallbackError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, scope: Scope) -> BoxCallbackFuture {
        let f = Arc::clone(&self.f);
        Box::pin(async move { f(&scope) })
    }
}
