//! Error types used by the story runtime and by user callbacks.
//!
//! This module defines:
//!
//! - [`StoryError`]: every failure the orchestrator can report for a story.
//! - [`CallbackError`]: the error a user-supplied callback returns.
//! - [`TimedOut`]: the raw outcome of a boot phase that overran its limit.
//!
//! [`StoryError`] provides helper methods (`as_label`, `as_message`) for logging,
//! and [`StoryError::is_configuration`] to tell caller mistakes from test failures.

use std::time::Duration;
use thiserror::Error;

use crate::core::Phase;

/// # Error returned by a user callback.
///
/// Callbacks (action bodies, hooks, checkers) report failures with a plain
/// message. The orchestrator wraps it into [`StoryError::Callback`] together
/// with the story and phase it came from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CallbackError {
    message: String,
}

impl CallbackError {
    /// Creates a callback error from any displayable message.
    pub fn new(message: impl std::fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for CallbackError {
    fn from(err: serde_json::Error) -> Self {
        CallbackError::new(err)
    }
}

impl From<String> for CallbackError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for CallbackError {
    fn from(message: &str) -> Self {
        CallbackError::new(message)
    }
}

/// A boot phase that ran past its limit.
///
/// `configured` is the limit set on the story; `elapsed` the measured wall time,
/// which is always `>= configured` when the timer fired.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("timed out after {elapsed:?} (limit {configured:?})")]
pub struct TimedOut {
    /// The limit resolved for the story.
    pub configured: Duration,
    /// Time measured from the start of the boot phase.
    pub elapsed: Duration,
}

/// # Errors produced while running a story.
///
/// Kinds:
/// - configuration: [`NoRunnableAction`](StoryError::NoRunnableAction),
///   [`ExpectationNotSpecified`](StoryError::ExpectationNotSpecified),
///   [`CheckerNotSpecified`](StoryError::CheckerNotSpecified);
/// - lookup: [`UnknownAction`](StoryError::UnknownAction),
///   [`UnknownAssertion`](StoryError::UnknownAssertion);
/// - runtime: [`Timeout`](StoryError::Timeout), [`Callback`](StoryError::Callback),
///   [`Panicked`](StoryError::Panicked), [`Teardown`](StoryError::Teardown).
///
/// None of them are retried.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoryError {
    /// The story has no action to run at boot time.
    #[error("story '{story}' has no runnable action")]
    NoRunnableAction {
        /// Path of the story.
        story: String,
    },

    /// Neither the story nor an ancestor says whether it can or cannot succeed.
    #[error("story '{story}' does not specify an expectation")]
    ExpectationNotSpecified {
        /// Path of the story.
        story: String,
    },

    /// No checker and no assertion is bound for the resolved expectation.
    #[error("story '{story}' has no checker for '{expectation}'")]
    CheckerNotSpecified {
        /// Path of the story.
        story: String,
        /// Label of the resolved expectation.
        expectation: &'static str,
    },

    /// An action binding refers to a name missing from the action registry.
    #[error("story '{story}' refers to unknown action '{name}'")]
    UnknownAction {
        /// Path of the story.
        story: String,
        /// The referenced action name.
        name: String,
    },

    /// An assertion binding refers to a name missing from the action registry.
    #[error("story '{story}' refers to unknown assertion '{name}'")]
    UnknownAssertion {
        /// Path of the story.
        story: String,
        /// The referenced assertion name.
        name: String,
    },

    /// The boot phase exceeded the story's effective timeout.
    #[error("story '{story}' timed out after {elapsed:?} (limit {configured:?})")]
    Timeout {
        /// Path of the story.
        story: String,
        /// The configured limit.
        configured: Duration,
        /// Measured time spent in the boot phase.
        elapsed: Duration,
    },

    /// A user callback failed.
    #[error("story '{story}' failed in {phase} ({callback}): {source}")]
    Callback {
        /// Path of the story.
        story: String,
        /// Phase in which the callback ran.
        phase: Phase,
        /// Name of the callback.
        callback: String,
        /// What the callback reported.
        #[source]
        source: CallbackError,
    },

    /// The story's task panicked (only reported by the suite runner).
    #[error("story '{story}' panicked: {message}")]
    Panicked {
        /// Path of the story.
        story: String,
        /// Panic payload, if it was a string.
        message: String,
    },

    /// The teardown hook failed, possibly after an earlier failure.
    #[error("story '{story}' teardown failed: {error}{}", prior_suffix(prior))]
    Teardown {
        /// Path of the story.
        story: String,
        /// The teardown failure itself.
        error: Box<StoryError>,
        /// The failure recorded before teardown ran, if any.
        prior: Option<Box<StoryError>>,
    },
}

fn prior_suffix(prior: &Option<Box<StoryError>>) -> String {
    match prior {
        Some(p) => format!(" (after: {p})"),
        None => String::new(),
    }
}

impl StoryError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use storyvisor::StoryError;
    /// use std::time::Duration;
    ///
    /// let err = StoryError::Timeout {
    ///     story: "login".into(),
    ///     configured: Duration::from_secs(1),
    ///     elapsed: Duration::from_secs(2),
    /// };
    /// assert_eq!(err.as_label(), "story_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            StoryError::NoRunnableAction { .. } => "story_no_runnable_action",
            StoryError::ExpectationNotSpecified { .. } => "story_expectation_not_specified",
            StoryError::CheckerNotSpecified { .. } => "story_checker_not_specified",
            StoryError::UnknownAction { .. } => "story_unknown_action",
            StoryError::UnknownAssertion { .. } => "story_unknown_assertion",
            StoryError::Timeout { .. } => "story_timeout",
            StoryError::Callback { .. } => "story_callback_failed",
            StoryError::Panicked { .. } => "story_panicked",
            StoryError::Teardown { .. } => "story_teardown_failed",
        }
    }

    /// Returns a human-readable message without the story path.
    pub fn as_message(&self) -> String {
        match self {
            StoryError::NoRunnableAction { .. } => "no runnable action".to_string(),
            StoryError::ExpectationNotSpecified { .. } => "expectation not specified".to_string(),
            StoryError::CheckerNotSpecified { expectation, .. } => {
                format!("no checker for {expectation}")
            }
            StoryError::UnknownAction { name, .. } => format!("unknown action: {name}"),
            StoryError::UnknownAssertion { name, .. } => format!("unknown assertion: {name}"),
            StoryError::Timeout {
                configured,
                elapsed,
                ..
            } => format!("timeout: {elapsed:?} > {configured:?}"),
            StoryError::Callback {
                phase,
                callback,
                source,
                ..
            } => format!("{phase}/{callback}: {source}"),
            StoryError::Panicked { message, .. } => format!("panic: {message}"),
            StoryError::Teardown { error, .. } => format!("teardown: {}", error.as_message()),
        }
    }

    /// Path of the story the error belongs to.
    pub fn story(&self) -> &str {
        match self {
            StoryError::NoRunnableAction { story }
            | StoryError::ExpectationNotSpecified { story }
            | StoryError::CheckerNotSpecified { story, .. }
            | StoryError::UnknownAction { story, .. }
            | StoryError::UnknownAssertion { story, .. }
            | StoryError::Timeout { story, .. }
            | StoryError::Callback { story, .. }
            | StoryError::Panicked { story, .. }
            | StoryError::Teardown { story, .. } => story,
        }
    }

    /// Phase the error was raised in, when it is tied to one.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            StoryError::UnknownAction { .. } => Some(Phase::Inherit),
            StoryError::NoRunnableAction { .. } | StoryError::Timeout { .. } => Some(Phase::Boot),
            StoryError::ExpectationNotSpecified { .. }
            | StoryError::CheckerNotSpecified { .. }
            | StoryError::UnknownAssertion { .. } => Some(Phase::Assert),
            StoryError::Callback { phase, .. } => Some(*phase),
            StoryError::Teardown { .. } => Some(Phase::Teardown),
            StoryError::Panicked { .. } => None,
        }
    }

    /// Indicates a mistake in how the story tree was declared rather than a
    /// failing test.
    ///
    /// # Example
    /// ```
    /// use storyvisor::StoryError;
    ///
    /// let err = StoryError::NoRunnableAction { story: "empty".into() };
    /// assert!(err.is_configuration());
    /// ```
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            StoryError::NoRunnableAction { .. }
                | StoryError::ExpectationNotSpecified { .. }
                | StoryError::CheckerNotSpecified { .. }
        )
    }

    /// Returns the inner timeout if this error is (or wraps, for teardown) one.
    pub fn as_timeout(&self) -> Option<TimedOut> {
        match self {
            StoryError::Timeout {
                configured,
                elapsed,
                ..
            } => Some(TimedOut {
                configured: *configured,
                elapsed: *elapsed,
            }),
            StoryError::Teardown { prior: Some(p), .. } => p.as_timeout(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teardown_message_mentions_prior_failure() {
        let err = StoryError::Teardown {
            story: "a / b".into(),
            error: Box::new(StoryError::Callback {
                story: "a / b".into(),
                phase: Phase::Teardown,
                callback: "cleanup".into(),
                source: CallbackError::new("disk full"),
            }),
            prior: Some(Box::new(StoryError::NoRunnableAction {
                story: "a / b".into(),
            })),
        };
        let text = err.to_string();
        assert!(text.contains("disk full"), "{text}");
        assert!(text.contains("no runnable action"), "{text}");
        assert_eq!(err.story(), "a / b");
        assert!(!err.is_configuration());
    }

    #[test]
    fn timeout_is_visible_through_teardown() {
        let timeout = StoryError::Timeout {
            story: "s".into(),
            configured: Duration::from_secs(1),
            elapsed: Duration::from_millis(1500),
        };
        let wrapped = StoryError::Teardown {
            story: "s".into(),
            error: Box::new(StoryError::Panicked {
                story: "s".into(),
                message: "x".into(),
            }),
            prior: Some(Box::new(timeout)),
        };
        let t = wrapped.as_timeout().expect("timeout");
        assert_eq!(t.configured, Duration::from_secs(1));
        assert_eq!(t.elapsed, Duration::from_millis(1500));
    }
}
