//! # Story tree node.
//!
//! A [`Story`] owns its children and holds a non-owning (`Weak`) reference to
//! its parent, so ancestor walks cost `O(depth)` without reference cycles.
//!
//! ## Architecture
//! ```text
//!            Arc<Story> root
//!            ├── children: Vec<Arc<Story>>   (owned)
//!            │      └── parent: Weak<Story>  (back-reference)
//!            ├── attrs: AttributeStore       (immutable after build)
//!            ├── state: Mutex<RunState>      (phase markers, result, cache)
//!            └── outcome: OnceCell           (set once by the first run)
//! ```
//!
//! ## Rules
//! - Trees are built in one pass by [`StoryBuilder`](crate::StoryBuilder), so
//!   `child.parent()` always points at the story whose `children()` holds it
//! - Attributes never change after build; only run state mutates
//! - Keep the root alive while running: a story whose ancestors were dropped
//!   resolves as if it were a root
//! - The state lock is never held across an `.await`

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::core::{Phase, Status};
use crate::error::StoryError;
use crate::resolve::EffectiveConfig;
use crate::story::attributes::AttributeStore;
use crate::story::result::ResultHolder;
use crate::values::{Scope, Value, Values};

static STORY_SEQ: AtomicU64 = AtomicU64::new(0);

/// Identifier of a story, unique within the process and stable for its lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoryId(u64);

impl StoryId {
    fn next() -> Self {
        StoryId(STORY_SEQ.fetch_add(1, AtomicOrdering::Relaxed) + 1)
    }

    /// Raw numeric value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "story-{}", self.0)
    }
}

/// Mutable per-run state of a story.
#[derive(Default)]
struct RunState {
    ran: HashSet<Phase>,
    effective: Option<Arc<EffectiveConfig>>,
    skipped: bool,
    result: ResultHolder,
    variables: Values,
}

/// A node of the story tree.
pub struct Story {
    id: StoryId,
    name: Arc<str>,
    parent: Weak<Story>,
    children: Vec<Arc<Story>>,
    attrs: AttributeStore,
    state: Mutex<RunState>,
    outcome: OnceCell<Result<Status, StoryError>>,
}

impl Story {
    pub(crate) fn new(
        name: Arc<str>,
        parent: Weak<Story>,
        children: Vec<Arc<Story>>,
        attrs: AttributeStore,
    ) -> Self {
        Self {
            id: StoryId::next(),
            name,
            parent,
            children,
            attrs,
            state: Mutex::new(RunState::default()),
            outcome: OnceCell::new(),
        }
    }

    /// Returns the story id.
    pub fn id(&self) -> StoryId {
        self.id
    }

    /// Returns the local name fragment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parent, if any (and still alive).
    pub fn parent(&self) -> Option<Arc<Story>> {
        self.parent.upgrade()
    }

    /// Returns the children in declaration order.
    pub fn children(&self) -> &[Arc<Story>] {
        &self.children
    }

    /// Returns true if the story has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Locally declared attributes.
    pub fn attributes(&self) -> &AttributeStore {
        &self.attrs
    }

    /// Ancestors, nearest first (self excluded).
    pub fn ancestors(&self) -> Vec<Arc<Story>> {
        let mut out = Vec::new();
        let mut cursor = self.parent();
        while let Some(story) = cursor {
            cursor = story.parent();
            out.push(story);
        }
        out
    }

    /// Names from the root down to this story.
    pub fn lineage_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .ancestors()
            .iter()
            .rev()
            .map(|s| s.name().to_string())
            .collect();
        names.push(self.name.to_string());
        names
    }

    /// Names from the root down to this story, joined by `" / "`.
    pub fn path(&self) -> String {
        self.lineage_names().join(" / ")
    }

    /// Leaf descendants in depth-first order; a leaf returns itself.
    pub fn leaves(self: &Arc<Self>) -> Vec<Arc<Story>> {
        let mut out = Vec::new();
        let mut stack = vec![Arc::clone(self)];
        while let Some(story) = stack.pop() {
            if story.is_leaf() {
                out.push(story);
            } else {
                stack.extend(story.children.iter().rev().cloned());
            }
        }
        out
    }

    /// Every story of the subtree (self included), depth-first pre-order.
    pub fn descendants(self: &Arc<Self>) -> Vec<Arc<Story>> {
        let mut out = Vec::new();
        let mut stack = vec![Arc::clone(self)];
        while let Some(story) = stack.pop() {
            stack.extend(story.children.iter().rev().cloned());
            out.push(story);
        }
        out
    }

    /// Snapshot of the story's result holder.
    pub fn result(&self) -> ResultHolder {
        self.state().result.clone()
    }

    /// Values stored by actions under their variable names.
    pub fn variables(&self) -> Values {
        self.state().variables.clone()
    }

    /// Recorded outcome, once the story finished running.
    pub fn outcome(&self) -> Option<Result<Status, StoryError>> {
        self.outcome.get().cloned()
    }

    /// Whether the story was skipped by isolation.
    pub fn is_skipped(&self) -> bool {
        self.state().skipped
    }

    /// Whether `phase` already ran for this story.
    pub fn has_run(&self, phase: Phase) -> bool {
        self.state().ran.contains(&phase)
    }

    /// Cached effective configuration, if already resolved.
    pub fn effective(&self) -> Option<Arc<EffectiveConfig>> {
        self.state().effective.clone()
    }

    fn state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks `phase` as run; returns false if it already was.
    pub(crate) fn mark(&self, phase: Phase) -> bool {
        self.state().ran.insert(phase)
    }

    /// Stores the resolved configuration unless another caller got there first;
    /// returns the one that is kept.
    pub(crate) fn cache_effective(&self, effective: Arc<EffectiveConfig>) -> Arc<EffectiveConfig> {
        let mut state = self.state();
        Arc::clone(state.effective.get_or_insert(effective))
    }

    pub(crate) fn set_skipped(&self, skipped: bool) {
        self.state().skipped = skipped;
    }

    pub(crate) fn record_value(&self, variable: Option<&str>, value: Value) {
        let mut state = self.state();
        if let Some(var) = variable {
            state.variables.insert(var.to_string(), value.clone());
        }
        state.result.record_value(value);
    }

    pub(crate) fn record_error(&self, error: StoryError) {
        self.state().result.record_error(error);
    }

    /// Cell holding the outcome; the first run initializes it, concurrent
    /// callers wait for that run.
    pub(crate) fn outcome_cell(&self) -> &OnceCell<Result<Status, StoryError>> {
        &self.outcome
    }

    /// Builds the scope for one callback invocation.
    ///
    /// Later sources override earlier ones: story data, then stored variables,
    /// then the binding's arguments.
    pub(crate) fn scope(
        &self,
        data: &Values,
        arguments: Option<&Values>,
        cancel: &CancellationToken,
    ) -> Scope {
        let state = self.state();
        let mut values = data.clone();
        values.extend(state.variables.iter().map(|(k, v)| (k.clone(), v.clone())));
        if let Some(args) = arguments {
            values.extend(args.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Scope::new(self.path(), values, cancel.clone())
            .with_result(state.result.value().cloned())
            .with_error(state.result.error().cloned())
    }
}

impl fmt::Debug for Story {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Story")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("children", &self.children.len())
            .finish()
    }
}
