//! # Effective configuration of a story.
//!
//! [`EffectiveConfig`] is what a story looks like once its whole lineage has
//! been merged. It is computed once per story and cached on it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;

use crate::actions::Action;
use crate::callbacks::CallbackRef;
use crate::story::{Expectation, Hook, Tag, Toggle};
use crate::values::Values;

/// An action binding after name lookup and inheritance.
#[derive(Clone, Debug)]
pub struct ResolvedAction {
    action: Arc<Action>,
    arguments: Values,
    order: u64,
    seq: u64,
}

impl ResolvedAction {
    pub(crate) fn new(action: Arc<Action>, arguments: Values, order: u64, seq: u64) -> Self {
        Self {
            action,
            arguments,
            order,
            seq,
        }
    }

    /// The resolved action.
    pub fn action(&self) -> &Arc<Action> {
        &self.action
    }

    /// Arguments of the winning binding.
    pub fn arguments(&self) -> &Values {
        &self.arguments
    }

    /// Effective order.
    pub fn order(&self) -> u64 {
        self.order
    }

    /// Tie-breaking sequence number of the winning binding.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub(crate) fn sort_key(&self) -> (u64, u64) {
        (self.order, self.seq)
    }
}

/// Callbacks after inheritance.
///
/// `before` and `after` hold one entry per level that set them, outermost
/// first; the other slots hold the nearest non-empty value.
#[derive(Clone, Default)]
pub struct MergedHooks {
    pub(crate) before: Vec<CallbackRef>,
    pub(crate) after: Vec<CallbackRef>,
    pub(crate) set_up: Option<CallbackRef>,
    pub(crate) tear_down: Option<CallbackRef>,
    pub(crate) can: Option<CallbackRef>,
    pub(crate) cannot: Option<CallbackRef>,
}

impl MergedHooks {
    /// `before` callbacks, outermost ancestor first.
    pub fn before(&self) -> &[CallbackRef] {
        &self.before
    }

    /// `after` callbacks, outermost ancestor first.
    pub fn after(&self) -> &[CallbackRef] {
        &self.after
    }

    /// Nearest callback for a single-valued slot.
    ///
    /// Returns `None` for [`Hook::Before`] and [`Hook::After`], which are lists.
    pub fn get(&self, hook: Hook) -> Option<&CallbackRef> {
        match hook {
            Hook::SetUp => self.set_up.as_ref(),
            Hook::TearDown => self.tear_down.as_ref(),
            Hook::Can => self.can.as_ref(),
            Hook::Cannot => self.cannot.as_ref(),
            Hook::Before | Hook::After => None,
        }
    }

    /// The checker for `expectation`.
    pub fn checker(&self, expectation: Expectation) -> Option<&CallbackRef> {
        self.get(Hook::checker(expectation))
    }
}

/// The fully merged configuration of one story.
#[derive(Clone, Default)]
pub struct EffectiveConfig {
    pub(crate) actions: Vec<ResolvedAction>,
    pub(crate) hooks: MergedHooks,
    pub(crate) tags: IndexMap<String, Tag>,
    pub(crate) data: Values,
    pub(crate) timeout: Toggle<Duration>,
    pub(crate) expectation: Option<Expectation>,
}

impl EffectiveConfig {
    /// Actions in execution order.
    pub fn actions(&self) -> &[ResolvedAction] {
        &self.actions
    }

    /// Merged callbacks.
    pub fn hooks(&self) -> &MergedHooks {
        &self.hooks
    }

    /// Merged tags, sorted by tag order.
    pub fn tags(&self) -> &IndexMap<String, Tag> {
        &self.tags
    }

    /// Merged key/value data.
    pub fn data(&self) -> &Values {
        &self.data
    }

    /// The timeout setting that won the upward search.
    ///
    /// `Unset` means no story in the lineage said anything.
    pub fn timeout_setting(&self) -> Toggle<Duration> {
        self.timeout
    }

    /// The effective timeout (`None` = none).
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.enabled()
    }

    /// Resolved expectation (`None` = unspecified).
    pub fn expectation(&self) -> Option<Expectation> {
        self.expectation
    }
}

impl fmt::Debug for EffectiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actions: Vec<&str> = self.actions.iter().map(|a| a.action.name()).collect();
        f.debug_struct("EffectiveConfig")
            .field("actions", &actions)
            .field("before", &self.hooks.before.len())
            .field("after", &self.hooks.after.len())
            .field("tags", &self.tags)
            .field("data", &self.data)
            .field("timeout", &self.timeout)
            .field("expectation", &self.expectation)
            .finish()
    }
}
