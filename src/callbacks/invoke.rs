//! # Dependency-binding seam.
//!
//! The orchestrator never calls a [`Callback`] directly; it goes through an
//! [`Invoke`] implementation with the [`Scope`] it assembled. This is the one
//! place where a host framework can plug in its own parameter binding,
//! argument validation or instrumentation.
//!
//! [`DirectInvoker`] is the default: it hands the scope to the callback as is.

use crate::callbacks::callback::{BoxCallbackFuture, CallbackRef};
use crate::values::Scope;

/// Invokes a callback with the values available to it.
pub trait Invoke: Send + Sync + 'static {
    /// Starts one invocation of `callback`.
    fn invoke(&self, callback: &CallbackRef, scope: Scope) -> BoxCallbackFuture;
}

/// Passes the scope straight through to the callback.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectInvoker;

impl Invoke for DirectInvoker {
    #[inline]
    fn invoke(&self, callback: &CallbackRef, scope: Scope) -> BoxCallbackFuture {
        callback.call(scope)
    }
}
