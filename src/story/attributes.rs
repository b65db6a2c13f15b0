//! # Per-story attribute store.
//!
//! [`AttributeStore`] holds what a single story declares locally, before
//! inheritance. Each family has its own slot; the resolver merges the slots of
//! a whole lineage (see [`Resolver`](crate::Resolver)).
//!
//! Boolean-like attributes that inheritance must tell apart from "never set"
//! are tri-states:
//! - timeout: [`Toggle`] (`Unset` / `Enabled(d)` / `Disabled`);
//! - expectation: `Option<Expectation>` plus an explicit halt marker.

use std::fmt;
use std::time::Duration;

use indexmap::IndexMap;

use crate::actions::{ActionBinding, AssertionBinding};
use crate::callbacks::CallbackRef;
use crate::values::{Value, Values};

/// Whether a story is expected to succeed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Expectation {
    /// The story describes something that can be done.
    Can,
    /// The story describes something that cannot be done.
    Cannot,
}

impl Expectation {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            Expectation::Can => "can",
            Expectation::Cannot => "cannot",
        }
    }

    /// The assertion bucket that applies under this expectation.
    pub fn bucket(&self) -> Bucket {
        match self {
            Expectation::Can => Bucket::Can,
            Expectation::Cannot => Bucket::Cannot,
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Tri-state setting: never set, explicitly on (with a value), explicitly off.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Toggle<T> {
    /// Nothing declared at this level; inheritance keeps looking upward.
    #[default]
    Unset,
    /// Explicitly enabled with a value; stops the upward search.
    Enabled(T),
    /// Explicitly disabled; stops the upward search.
    Disabled,
}

impl<T: Copy> Toggle<T> {
    /// Returns the value if explicitly enabled.
    pub fn enabled(&self) -> Option<T> {
        match self {
            Toggle::Enabled(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns true unless `Unset`.
    pub fn is_set(&self) -> bool {
        !matches!(self, Toggle::Unset)
    }
}

/// Assertion bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Runs whatever the expectation is.
    Always,
    /// Runs only for stories expected to succeed.
    Can,
    /// Runs only for stories expected to fail.
    Cannot,
}

/// Named callback slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hook {
    /// Runs before the actions; composed across levels, outermost first.
    Before,
    /// Runs after the actions; composed across levels, outermost first.
    After,
    /// Runs at the very start of boot; nearest level wins.
    SetUp,
    /// Runs in the teardown phase; nearest level wins.
    TearDown,
    /// Checker for `can` stories; nearest level wins.
    Can,
    /// Checker for `cannot` stories; nearest level wins.
    Cannot,
}

impl Hook {
    /// The checker slot for an expectation.
    pub fn checker(expectation: Expectation) -> Hook {
        match expectation {
            Expectation::Can => Hook::Can,
            Expectation::Cannot => Hook::Cannot,
        }
    }
}

/// Callback slots of one story.
#[derive(Clone, Default)]
pub struct Hooks {
    before: Option<CallbackRef>,
    after: Option<CallbackRef>,
    set_up: Option<CallbackRef>,
    tear_down: Option<CallbackRef>,
    can: Option<CallbackRef>,
    cannot: Option<CallbackRef>,
}

impl Hooks {
    /// Returns the callback in `hook`, if set.
    pub fn get(&self, hook: Hook) -> Option<&CallbackRef> {
        match hook {
            Hook::Before => self.before.as_ref(),
            Hook::After => self.after.as_ref(),
            Hook::SetUp => self.set_up.as_ref(),
            Hook::TearDown => self.tear_down.as_ref(),
            Hook::Can => self.can.as_ref(),
            Hook::Cannot => self.cannot.as_ref(),
        }
    }

    pub(crate) fn set(&mut self, hook: Hook, callback: CallbackRef) {
        let slot = match hook {
            Hook::Before => &mut self.before,
            Hook::After => &mut self.after,
            Hook::SetUp => &mut self.set_up,
            Hook::TearDown => &mut self.tear_down,
            Hook::Can => &mut self.can,
            Hook::Cannot => &mut self.cannot,
        };
        *slot = Some(callback);
    }
}

/// A tag value with its display order.
#[derive(Clone, Debug, PartialEq)]
pub struct Tag {
    value: Value,
    order: u64,
}

impl Tag {
    /// Creates a tag.
    pub fn new(value: impl Into<Value>, order: u64) -> Self {
        Self {
            value: value.into(),
            order,
        }
    }

    /// Returns the tag value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the tag order.
    pub fn order(&self) -> u64 {
        self.order
    }
}

/// Everything one story declares locally.
#[derive(Clone, Default)]
pub struct AttributeStore {
    actions: Vec<ActionBinding>,
    always: Vec<AssertionBinding>,
    can: Vec<AssertionBinding>,
    cannot: Vec<AssertionBinding>,
    hooks: Hooks,
    tags: IndexMap<String, Tag>,
    data: Values,
    timeout: Toggle<Duration>,
    isolated: bool,
    expectation: Option<Expectation>,
    expectation_halt: bool,
}

impl AttributeStore {
    /// Local action bindings, in declaration order.
    pub fn actions(&self) -> &[ActionBinding] {
        &self.actions
    }

    /// Local assertion bindings of one bucket.
    pub fn assertions(&self, bucket: Bucket) -> &[AssertionBinding] {
        match bucket {
            Bucket::Always => &self.always,
            Bucket::Can => &self.can,
            Bucket::Cannot => &self.cannot,
        }
    }

    /// Local callback slots.
    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Local tags.
    pub fn tags(&self) -> &IndexMap<String, Tag> {
        &self.tags
    }

    /// Local key/value data.
    pub fn data(&self) -> &Values {
        &self.data
    }

    /// Local timeout setting.
    pub fn timeout(&self) -> Toggle<Duration> {
        self.timeout
    }

    /// Whether this story was marked for isolated execution.
    pub fn is_isolated(&self) -> bool {
        self.isolated
    }

    /// Local expectation.
    pub fn expectation(&self) -> Option<Expectation> {
        self.expectation
    }

    /// Whether expectation inheritance stops at this story.
    pub fn expectation_halt(&self) -> bool {
        self.expectation_halt
    }

    /// Binds an action; a binding with the same name at this level is replaced.
    pub(crate) fn bind_action(&mut self, binding: ActionBinding) {
        Self::bind(&mut self.actions, binding);
    }

    /// Binds an assertion; same replacement rule as actions, per bucket.
    pub(crate) fn bind_assertion(&mut self, bucket: Bucket, binding: AssertionBinding) {
        let list = match bucket {
            Bucket::Always => &mut self.always,
            Bucket::Can => &mut self.can,
            Bucket::Cannot => &mut self.cannot,
        };
        Self::bind(list, binding);
    }

    fn bind(list: &mut Vec<ActionBinding>, binding: ActionBinding) {
        list.retain(|b| b.name() != binding.name());
        list.push(binding);
    }

    pub(crate) fn set_hook(&mut self, hook: Hook, callback: CallbackRef) {
        self.hooks.set(hook, callback);
    }

    pub(crate) fn set_tag(&mut self, key: String, tag: Tag) {
        self.tags.insert(key, tag);
    }

    pub(crate) fn set_data(&mut self, key: String, value: Value) {
        self.data.insert(key, value);
    }

    pub(crate) fn set_timeout(&mut self, timeout: Toggle<Duration>) {
        self.timeout = timeout;
    }

    pub(crate) fn set_isolated(&mut self) {
        self.isolated = true;
    }

    pub(crate) fn set_expectation(&mut self, expectation: Expectation) {
        self.expectation = Some(expectation);
    }

    pub(crate) fn reset_expectation(&mut self) {
        self.expectation = None;
        self.expectation_halt = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_level_rebind_is_last_write_wins() {
        let mut store = AttributeStore::default();
        store.bind_action(ActionBinding::new("a").with_argument("v", 1).sequenced(1));
        store.bind_action(ActionBinding::new("b").sequenced(2));
        store.bind_action(ActionBinding::new("a").with_argument("v", 2).sequenced(3));

        let names: Vec<&str> = store.actions().iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(store.actions()[1].arguments()["v"], Value::from(2));
    }

    #[test]
    fn reset_expectation_sets_halt() {
        let mut store = AttributeStore::default();
        store.set_expectation(Expectation::Can);
        store.reset_expectation();
        assert_eq!(store.expectation(), None);
        assert!(store.expectation_halt());
    }

    #[test]
    fn toggle_tri_state() {
        let unset: Toggle<Duration> = Toggle::default();
        assert!(!unset.is_set());
        assert_eq!(Toggle::Enabled(Duration::from_secs(1)).enabled(), Some(Duration::from_secs(1)));
        assert!(Toggle::<Duration>::Disabled.is_set());
        assert_eq!(Toggle::<Duration>::Disabled.enabled(), None);
    }
}
