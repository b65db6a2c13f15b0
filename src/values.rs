//! # Values passed to callbacks.
//!
//! Story data, action arguments and callback results are plain JSON values
//! ([`Value`]). A [`Scope`] is the snapshot handed to every callback
//! invocation: it is what the dependency-binding collaborator resolves named
//! parameters from.
//!
//! ## Lookup order
//! ```text
//! Scope::get("key")
//!   ├─► action arguments        (bound on the ActionBinding)
//!   ├─► stored variables        (results of earlier actions)
//!   └─► story data              (merged root → leaf, leaf wins)
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::{CallbackError, StoryError};

/// Any value a story carries around.
pub type Value = serde_json::Value;

/// Insertion-ordered map of named values.
pub type Values = IndexMap<String, Value>;

/// Snapshot of everything a callback may bind its parameters from.
#[derive(Clone, Debug)]
pub struct Scope {
    story: Arc<str>,
    values: Values,
    result: Option<Value>,
    error: Option<StoryError>,
    cancel: CancellationToken,
}

impl Scope {
    /// Creates a scope from already merged values.
    pub fn new(story: impl Into<Arc<str>>, values: Values, cancel: CancellationToken) -> Self {
        Self {
            story: story.into(),
            values,
            result: None,
            error: None,
            cancel,
        }
    }

    /// Attaches the current result of the story.
    pub fn with_result(mut self, result: Option<Value>) -> Self {
        self.result = result;
        self
    }

    /// Attaches the most recent error recorded for the story.
    pub fn with_error(mut self, error: Option<StoryError>) -> Self {
        self.error = error;
        self
    }

    /// Path of the story this callback runs for.
    pub fn story(&self) -> &str {
        &self.story
    }

    /// Looks up a raw value by name.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Looks up a value and deserializes it.
    ///
    /// # Example
    /// ```
    /// use storyvisor::{Scope, Values};
    /// use tokio_util::sync::CancellationToken;
    ///
    /// let mut values = Values::new();
    /// values.insert("attempts".into(), serde_json::json!(3));
    /// let scope = Scope::new("login", values, CancellationToken::new());
    ///
    /// let attempts: u32 = scope.get("attempts").unwrap();
    /// assert_eq!(attempts, 3);
    /// assert!(scope.get::<u32>("missing").is_err());
    /// ```
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, CallbackError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| CallbackError::new(format!("no value named '{key}'")))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// All values visible to the callback.
    pub fn values(&self) -> &Values {
        &self.values
    }

    /// Result of the most recent action, if any ran.
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Deserializes the current result.
    pub fn result_as<T: DeserializeOwned>(&self) -> Result<T, CallbackError> {
        let value = self
            .result
            .as_ref()
            .ok_or_else(|| CallbackError::new("story has no result yet"))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Most recent error recorded for the story.
    pub fn error(&self) -> Option<&StoryError> {
        self.error.as_ref()
    }

    /// Cancellation token of the running story.
    ///
    /// Cancelled when the boot phase times out; long-running callbacks should
    /// check it and return early.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Shorthand for `cancel_token().is_cancelled()`.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
