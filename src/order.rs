//! # Default ordering for bindings and tags.
//!
//! Every action, assertion and tag that does not carry an explicit order gets
//! one from an [`OrderCounter`]. Values start at 1 and only grow, so declaration
//! order becomes execution order unless something says otherwise.
//!
//! ## Rules
//! - `next()` never returns 0 and never returns the same value twice between resets
//! - The counter is shared across threads (`Relaxed` atomics are enough: only
//!   uniqueness and monotonicity per counter matter)
//! - [`OrderCounter::global`] is the process-wide default; builders accept an
//!   injected counter so tests can start from a known state

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<Arc<OrderCounter>> = OnceLock::new();

/// Monotonic source of default orders.
#[derive(Debug, Default)]
pub struct OrderCounter {
    last: AtomicU64,
}

impl OrderCounter {
    /// Creates a counter whose first value is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide counter.
    pub fn global() -> Arc<OrderCounter> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(OrderCounter::new())))
    }

    /// Returns the next order value.
    #[inline]
    pub fn next(&self) -> u64 {
        self.last.fetch_add(1, AtomicOrdering::Relaxed) + 1
    }

    /// Returns the last value handed out (0 if none yet).
    #[inline]
    pub fn current(&self) -> u64 {
        self.last.load(AtomicOrdering::Relaxed)
    }

    /// Restarts the counter; the next call to [`next`](Self::next) returns 1.
    pub fn reset(&self) {
        self.last.store(0, AtomicOrdering::Relaxed);
    }
}
