//! # Bindings of actions to stories.
//!
//! A story never holds an [`Action`] directly; it holds an [`ActionBinding`]:
//! the action (by name or inline), the arguments bound for this use, and an
//! optional explicit order.
//!
//! ## Ordering
//! ```text
//! effective order = binding.order ?? action.order ?? binding.seq
//! total order     = (effective order, seq)
//! ```
//! `seq` is drawn from the builder's [`OrderCounter`](crate::OrderCounter)
//! when the binding is attached to a story, so it doubles as the stable
//! tie-breaker.

use std::sync::Arc;

use crate::actions::action::Action;
use crate::values::{Value, Values};

/// Reference to an action: registered name or inline definition.
#[derive(Clone, Debug)]
pub enum ActionRef {
    /// Looked up in the [`ActionRegistry`](crate::ActionRegistry) at resolve time.
    Named(Arc<str>),
    /// Carried by the binding itself.
    Inline(Arc<Action>),
}

impl ActionRef {
    /// The name used as inheritance key.
    pub fn name(&self) -> &str {
        match self {
            ActionRef::Named(name) => name,
            ActionRef::Inline(action) => action.name(),
        }
    }
}

impl From<&str> for ActionRef {
    fn from(name: &str) -> Self {
        ActionRef::Named(name.into())
    }
}

impl From<String> for ActionRef {
    fn from(name: String) -> Self {
        ActionRef::Named(name.into())
    }
}

impl From<Action> for ActionRef {
    fn from(action: Action) -> Self {
        ActionRef::Inline(Arc::new(action))
    }
}

impl From<Arc<Action>> for ActionRef {
    fn from(action: Arc<Action>) -> Self {
        ActionRef::Inline(action)
    }
}

/// An action bound to a story together with its local arguments.
#[derive(Clone, Debug)]
pub struct ActionBinding {
    action: ActionRef,
    arguments: Values,
    order: Option<u64>,
    seq: u64,
}

/// Assertions are bound exactly like actions; the bucket decides when they run.
pub type AssertionBinding = ActionBinding;

impl ActionBinding {
    /// Binds `action` with no arguments and default ordering.
    pub fn new(action: impl Into<ActionRef>) -> Self {
        Self {
            action: action.into(),
            arguments: Values::new(),
            order: None,
            seq: 0,
        }
    }

    /// Adds one argument visible to this binding's callbacks.
    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Adds several arguments at once.
    pub fn with_arguments(mut self, arguments: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.arguments.extend(arguments);
        self
    }

    /// Overrides the order for this binding only.
    pub fn with_order(mut self, order: u64) -> Self {
        self.order = Some(order);
        self
    }

    /// Returns the action reference.
    pub fn action(&self) -> &ActionRef {
        &self.action
    }

    /// The name used as inheritance key.
    pub fn name(&self) -> &str {
        self.action.name()
    }

    /// Returns the bound arguments.
    pub fn arguments(&self) -> &Values {
        &self.arguments
    }

    /// Returns the explicit order, if any.
    pub fn order(&self) -> Option<u64> {
        self.order
    }

    /// Returns the sequence number assigned when the binding was attached.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub(crate) fn sequenced(mut self, seq: u64) -> Self {
        self.seq = seq;
        self
    }
}

impl From<&str> for ActionBinding {
    fn from(name: &str) -> Self {
        ActionBinding::new(name)
    }
}

impl From<String> for ActionBinding {
    fn from(name: String) -> Self {
        ActionBinding::new(name)
    }
}

impl From<Action> for ActionBinding {
    fn from(action: Action) -> Self {
        ActionBinding::new(action)
    }
}

impl From<Arc<Action>> for ActionBinding {
    fn from(action: Arc<Action>) -> Self {
        ActionBinding::new(action)
    }
}
