//! # Callback abstractions.
//!
//! This module provides the callback-related types:
//! - [`Callback`] - trait for user code invoked with a [`Scope`](crate::Scope)
//! - [`CallbackFn`] / [`SyncFn`] - closure-backed implementations
//! - [`CallbackRef`] - shared reference to a callback (`Arc<dyn Callback>`)
//! - [`Invoke`] / [`DirectInvoker`] - the binding seam the orchestrator calls through

mod callback;
mod callback_fn;
mod invoke;

pub use callback::{BoxCallbackFuture, Callback, CallbackRef};
pub use callback_fn::{CallbackFn, SyncFn};
pub use invoke::{DirectInvoker, Invoke};
