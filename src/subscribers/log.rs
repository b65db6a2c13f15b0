//! # Logging subscriber.
//!
//! [`LogWriter`] turns events into `tracing` records under the
//! `storyvisor` target. Install any `tracing` subscriber to see them.
//!
//! ## Output
//! ```text
//! INFO  story starting       story="login / with valid password"
//! DEBUG action invoked       story=".." action="login" repetition=1
//! WARN  boot timed out       story=".." timeout_ms=1000 elapsed_ms=1000
//! ERROR story failed         story=".." phase=boot reason=".."
//! INFO  suite finished       story="login" reason="passed=3 failed=1 .."
//! ```
//!
//! ## Example
//! ```no_run
//! # use std::sync::Arc;
//! # use storyvisor::{Config, LogWriter, Suite};
//! let suite = Suite::builder(Config::default())
//!     .with_subscribers(vec![Arc::new(LogWriter)])
//!     .build();
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber forwarding events to `tracing`.
///
/// Enabled via the `logging` feature.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let story = e.story.as_deref().unwrap_or("-");
        let phase = e.phase.map(|p| p.as_str()).unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::SuiteStarting => {
                tracing::info!(target: "storyvisor", seq = e.seq, story, cases = reason, "suite starting");
            }
            EventKind::SuiteFinished => {
                tracing::info!(target: "storyvisor", seq = e.seq, story, elapsed_ms = e.elapsed_ms, reason, "suite finished");
            }
            EventKind::StoryStarting => {
                tracing::info!(target: "storyvisor", seq = e.seq, story, "story starting");
            }
            EventKind::PhaseStarting => {
                tracing::trace!(target: "storyvisor", seq = e.seq, story, phase, "phase starting");
            }
            EventKind::ActionInvoked => {
                tracing::debug!(
                    target: "storyvisor",
                    seq = e.seq,
                    story,
                    phase,
                    action = e.action.as_deref().unwrap_or("-"),
                    repetition = e.repetition,
                    "action invoked"
                );
            }
            EventKind::TimeoutHit => {
                tracing::warn!(
                    target: "storyvisor",
                    seq = e.seq,
                    story,
                    timeout_ms = e.timeout_ms,
                    elapsed_ms = e.elapsed_ms,
                    "boot timed out"
                );
            }
            EventKind::StorySkipped => {
                tracing::info!(target: "storyvisor", seq = e.seq, story, "story skipped");
            }
            EventKind::StoryPassed => {
                tracing::info!(target: "storyvisor", seq = e.seq, story, "story passed");
            }
            EventKind::StoryFailed => {
                tracing::error!(target: "storyvisor", seq = e.seq, story, phase, reason, "story failed");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "storyvisor", seq = e.seq, subscriber = story, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(target: "storyvisor", seq = e.seq, subscriber = story, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
