//! # Result holder.
//!
//! Captures the most recent value produced by a story's actions and the most
//! recent error raised while running it, so later phases (assert, teardown)
//! and checkers can inspect both.

use crate::error::StoryError;
use crate::values::Value;

/// Latest value and error of one story.
///
/// `has_value` stays false until an action body returned successfully;
/// `error` is set whenever a phase fails and is kept even if a value exists.
#[derive(Clone, Debug, Default)]
pub struct ResultHolder {
    value: Option<Value>,
    error: Option<StoryError>,
    has_value: bool,
}

impl ResultHolder {
    /// Records a value produced by an action body.
    pub fn record_value(&mut self, value: Value) {
        self.value = Some(value);
        self.has_value = true;
    }

    /// Records the error of the most recent failing phase.
    pub fn record_error(&mut self, error: StoryError) {
        self.error = Some(error);
    }

    /// Latest value, if any action produced one.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Latest error, if a phase failed.
    pub fn error(&self) -> Option<&StoryError> {
        self.error.as_ref()
    }

    /// Whether an action produced a value.
    pub fn has_value(&self) -> bool {
        self.has_value
    }
}
