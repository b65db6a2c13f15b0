//! # Actions: reusable units of story behaviour.
//!
//! An [`Action`] is the body a story runs during boot (or, bound into an
//! assertion bucket, during assert), plus its bookkeeping:
//! - `variable`: where its result is stored for later callbacks;
//! - `order`: default position when bindings do not override it;
//! - `repeat`: how many times the body runs (`0` = never, default `1`);
//! - `on_register` / `on_boot`: optional hooks run before the body.
//!
//! Actions are either **named** (registered in an
//! [`ActionRegistry`](crate::ActionRegistry) and referenced by name from many
//! stories) or **inline** (attached directly to one binding).

use std::fmt;
use std::sync::Arc;

use crate::callbacks::CallbackRef;
use crate::order::OrderCounter;

/// A unit of behaviour a story can bind.
#[derive(Clone)]
pub struct Action {
    name: Arc<str>,
    body: CallbackRef,
    variable: Option<String>,
    order: Option<u64>,
    repeat: u32,
    on_register: Option<CallbackRef>,
    on_boot: Option<CallbackRef>,
}

impl Action {
    /// Creates an action running `body` once.
    pub fn new(name: impl Into<Arc<str>>, body: CallbackRef) -> Self {
        Self {
            name: name.into(),
            body,
            variable: None,
            order: None,
            repeat: 1,
            on_register: None,
            on_boot: None,
        }
    }

    /// Creates an action named after its body plus a unique sequence number.
    ///
    /// Two anonymous actions never share a name, so they never override each
    /// other through inheritance.
    ///
    /// The number comes from [`OrderCounter::global`]; use
    /// [`anonymous_from`](Action::anonymous_from) or
    /// [`StoryBuilder::inline_action`](crate::StoryBuilder::inline_action) to
    /// draw it from an injected counter.
    pub fn anonymous(body: CallbackRef) -> Self {
        Self::anonymous_from(body, &OrderCounter::global())
    }

    /// Like [`anonymous`](Action::anonymous), numbered from `counter`.
    pub fn anonymous_from(body: CallbackRef, counter: &OrderCounter) -> Self {
        let name = format!("{}#{}", body.name(), counter.next());
        Self::new(name, body)
    }

    /// Stores each result under `variable`.
    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }

    /// Sets the default order of bindings to this action.
    pub fn with_order(mut self, order: u64) -> Self {
        self.order = Some(order);
        self
    }

    /// Sets how many times the body runs per boot.
    pub fn with_repeat(mut self, repeat: u32) -> Self {
        self.repeat = repeat;
        self
    }

    /// Sets the hook run during the register phase.
    pub fn on_register(mut self, hook: CallbackRef) -> Self {
        self.on_register = Some(hook);
        self
    }

    /// Sets the hook run right before the body during boot.
    pub fn on_boot(mut self, hook: CallbackRef) -> Self {
        self.on_boot = Some(hook);
        self
    }

    /// Returns the action name (the inheritance key).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the body callback.
    pub fn body(&self) -> &CallbackRef {
        &self.body
    }

    /// Returns the result variable, if any.
    pub fn variable(&self) -> Option<&str> {
        self.variable.as_deref()
    }

    /// Returns the action's own default order, if any.
    pub fn order(&self) -> Option<u64> {
        self.order
    }

    /// Returns the repeat count.
    pub fn repeat(&self) -> u32 {
        self.repeat
    }

    /// Returns the register hook, if any.
    pub fn register_hook(&self) -> Option<&CallbackRef> {
        self.on_register.as_ref()
    }

    /// Returns the boot hook, if any.
    pub fn boot_hook(&self) -> Option<&CallbackRef> {
        self.on_boot.as_ref()
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("body", &self.body.name())
            .field("variable", &self.variable)
            .field("order", &self.order)
            .field("repeat", &self.repeat)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::SyncFn;
    use crate::values::{Scope, Value};

    #[test]
    fn anonymous_names_follow_the_given_counter() {
        let counter = OrderCounter::new();
        let body: CallbackRef = SyncFn::arc("step", |_scope: &Scope| Ok(Value::Null));

        let first = Action::anonymous_from(body.clone(), &counter);
        let second = Action::anonymous_from(body, &counter);
        assert_eq!(first.name(), "step#1");
        assert_eq!(second.name(), "step#2");
        assert_eq!(counter.current(), 2);
    }
}
