//! # Stateful subscriber that keeps every event it sees.
//!
//! [`Recorder`] appends each delivered event to an in-memory list. It is meant
//! for tests and tooling that want to inspect a run after the fact.
//!
//! ```text
//!  Suite ── emit(Event) ──► SubscriberSet ──► Recorder (Vec<Event> behind Mutex)
//!                                                │
//!  after Suite::run(): recorder.snapshot() ◄─────┘
//! ```
//!
//! `Suite::run` shuts the subscriber set down before returning, so a snapshot
//! taken afterwards contains every event of the run.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Collects delivered events in arrival order.
///
/// Cloneable; clones share the same list.
#[derive(Clone, Default)]
pub struct Recorder {
    inner: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event recorded so far.
    pub async fn snapshot(&self) -> Vec<Event> {
        self.inner.lock().await.clone()
    }

    /// Kinds of the recorded events, in arrival order.
    pub async fn kinds(&self) -> Vec<EventKind> {
        self.inner.lock().await.iter().map(|e| e.kind).collect()
    }

    /// Recorded events of one kind.
    pub async fn of_kind(&self, kind: EventKind) -> Vec<Event> {
        self.inner
            .lock()
            .await
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// Forgets everything recorded so far.
    pub async fn clear(&self) {
        self.inner.lock().await.clear();
    }
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.inner.lock().await.push(event.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}
