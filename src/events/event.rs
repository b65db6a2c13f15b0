//! # Runtime events emitted by the orchestrator and suites.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Story lifecycle**: a story starting, its phases, actions, and its outcome
//! - **Suite events**: a whole suite starting and finishing
//! - **Subscriber events**: delivery problems of observers
//!
//! The [`Event`] struct carries the metadata: timestamp, story path, phase,
//! action name, timing and a free-form reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use storyvisor::{Event, EventKind, Phase};
//!
//! let ev = Event::new(EventKind::TimeoutHit)
//!     .with_story("login / slow network")
//!     .with_phase(Phase::Boot)
//!     .with_timeout(Duration::from_secs(1))
//!     .with_elapsed(Duration::from_millis(1500));
//!
//! assert_eq!(ev.kind, EventKind::TimeoutHit);
//! assert_eq!(ev.story.as_deref(), Some("login / slow network"));
//! assert_eq!(ev.timeout_ms, Some(1000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::Phase;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `story`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `story`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Suite events ===
    /// A suite is about to run its cases.
    ///
    /// Sets:
    /// - `story`: root story path
    /// - `reason`: number of cases
    SuiteStarting,

    /// Every case of a suite finished.
    ///
    /// Sets:
    /// - `story`: root story path
    /// - `reason`: verdict counts
    /// - `elapsed_ms`: total wall time
    SuiteFinished,

    // === Story lifecycle events ===
    /// A story run starts (inherit phase about to begin).
    ///
    /// Sets:
    /// - `story`: story path
    StoryStarting,

    /// A phase of a story starts.
    ///
    /// Sets:
    /// - `story`: story path
    /// - `phase`: phase about to run
    PhaseStarting,

    /// An action body is invoked once.
    ///
    /// Sets:
    /// - `story`: story path
    /// - `phase`: `Boot` for actions, `Assert` for assertions
    /// - `action`: action name
    /// - `repetition`: 1-based repetition index
    ActionInvoked,

    /// The boot phase exceeded its limit.
    ///
    /// Sets:
    /// - `story`: story path
    /// - `timeout_ms`: configured limit (ms)
    /// - `elapsed_ms`: measured boot time (ms)
    TimeoutHit,

    /// The story was skipped by isolation.
    ///
    /// Sets:
    /// - `story`: story path
    StorySkipped,

    /// The story finished without error.
    ///
    /// Sets:
    /// - `story`: story path
    StoryPassed,

    /// The story finished with an error.
    ///
    /// Sets:
    /// - `story`: story path
    /// - `phase`: phase that failed, when known
    /// - `reason`: error message
    StoryFailed,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Story path (or subscriber name for subscriber events).
    pub story: Option<Arc<str>>,
    /// Phase the event belongs to.
    pub phase: Option<Phase>,
    /// Action name, if applicable.
    pub action: Option<Arc<str>>,
    /// Repetition index (starting from 1).
    pub repetition: Option<u32>,
    /// Configured timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Measured duration in milliseconds (compact).
    pub elapsed_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            story: None,
            phase: None,
            action: None,
            repetition: None,
            timeout_ms: None,
            elapsed_ms: None,
            reason: None,
        }
    }

    /// Attaches a story path.
    #[inline]
    pub fn with_story(mut self, story: impl Into<Arc<str>>) -> Self {
        self.story = Some(story.into());
        self
    }

    /// Attaches a phase.
    #[inline]
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Attaches an action name.
    #[inline]
    pub fn with_action(mut self, action: impl Into<Arc<str>>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Attaches a repetition index.
    #[inline]
    pub fn with_repetition(mut self, n: u32) -> Self {
        self.repetition = Some(n);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a measured duration (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed_ms = Some(compact_ms(d));
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_story(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_story(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}

fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}
