//! # Callback abstraction.
//!
//! This module defines the [`Callback`] trait: a named unit the orchestrator
//! invokes with a [`Scope`]. Action bodies, lifecycle hooks and can/cannot
//! checkers are all callbacks. The common handle type is [`CallbackRef`], an
//! `Arc<dyn Callback>` suitable for sharing across stories.
//!
//! Each call produces a **fresh** future that owns its scope, so a callback
//! may be invoked any number of times (repeat counts, several stories sharing
//! one action) without hidden shared state.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::CallbackError;
use crate::values::{Scope, Value};

/// Boxed future returned by [`Callback::call`].
pub type BoxCallbackFuture = BoxFuture<'static, Result<Value, CallbackError>>;

/// # Shared handle to a callback object.
pub type CallbackRef = Arc<dyn Callback>;

/// # Asynchronous, named unit of user code.
///
/// # Example
/// ```
/// use storyvisor::{BoxCallbackFuture, Callback, Scope};
///
/// struct Ping;
///
/// impl Callback for Ping {
///     fn name(&self) -> &str { "ping" }
///
///     fn call(&self, _scope: Scope) -> BoxCallbackFuture {
///         Box::pin(async { Ok(serde_json::json!("pong")) })
///     }
/// }
/// ```
pub trait Callback: Send + Sync + 'static {
    /// Returns a stable, human-readable name (used in errors and events).
    fn name(&self) -> &str;

    /// Starts one invocation.
    ///
    /// Long-running implementations should watch `scope.cancel_token()`:
    /// it is cancelled when the story's boot phase times out.
    fn call(&self, scope: Scope) -> BoxCallbackFuture;
}
