//! # Registry of named actions.
//!
//! Stories refer to reusable actions by name (`ActionRef::Named`); the
//! resolver looks those names up here. A missing name is reported as
//! [`StoryError::UnknownAction`](crate::StoryError::UnknownAction) (or
//! `UnknownAssertion`) when the story is resolved, not when it is built.
//!
//! ## Rules
//! - Registering a name twice replaces the earlier action (last write wins)
//! - Lookups hand out `Arc<Action>`; replacing an action does not affect
//!   stories that already resolved the old one

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::actions::action::Action;

/// Name → action map shared by every story an orchestrator runs.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: RwLock<HashMap<String, Arc<Action>>>,
}

impl ActionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `action` under its own name and returns the shared handle.
    pub fn register(&self, action: Action) -> Arc<Action> {
        let action = Arc::new(action);
        let mut actions = self.actions.write().unwrap_or_else(PoisonError::into_inner);
        if actions
            .insert(action.name().to_string(), Arc::clone(&action))
            .is_some()
        {
            tracing::debug!(action = action.name(), "replaced registered action");
        }
        action
    }

    /// Looks up an action by name.
    pub fn get(&self, name: &str) -> Option<Arc<Action>> {
        self.actions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Returns true if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.actions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Removes an action; returns it if it was registered.
    pub fn unregister(&self, name: &str) -> Option<Arc<Action>> {
        self.actions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// Returns sorted list of registered names.
    pub fn list(&self) -> Vec<String> {
        let actions = self.actions.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = actions.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.actions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}
