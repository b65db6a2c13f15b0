//! # Fluent story builder.
//!
//! [`StoryBuilder`] collects a story's local declarations and its children,
//! then [`build`](StoryBuilder::build) freezes the whole tree into
//! `Arc<Story>` nodes with parent back-references.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use storyvisor::{Action, ActionBinding, Story, SyncFn, Scope};
//! use serde_json::json;
//!
//! let login = Action::new("login", SyncFn::arc("login", |scope: &Scope| {
//!     let user: String = scope.get("user")?;
//!     Ok(json!({ "user": user }))
//! }))
//! .with_variable("session");
//!
//! let root = Story::builder("login")
//!     .data("user", "alice")
//!     .action(login)
//!     .timeout(Duration::from_secs(5))
//!     .child(Story::builder("with valid password").can())
//!     .child(
//!         Story::builder("with wrong password")
//!             .action(ActionBinding::new("login").with_argument("password", "nope"))
//!             .cannot(),
//!     )
//!     .build();
//!
//! assert_eq!(root.children().len(), 2);
//! assert_eq!(root.children()[0].path(), "login / with valid password");
//! ```

use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::actions::{Action, ActionBinding, AssertionBinding};
use crate::callbacks::CallbackRef;
use crate::order::OrderCounter;
use crate::story::attributes::{AttributeStore, Bucket, Expectation, Hook, Tag, Toggle};
use crate::story::node::Story;
use crate::values::Value;

/// Builder for a story and its subtree.
pub struct StoryBuilder {
    name: String,
    attrs: AttributeStore,
    children: Vec<StoryBuilder>,
    counter: Arc<OrderCounter>,
}

impl StoryBuilder {
    /// Creates a builder drawing default orders from [`OrderCounter::global`].
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_counter(name, OrderCounter::global())
    }

    /// Creates a builder drawing default orders from `counter`.
    pub fn with_counter(name: impl Into<String>, counter: Arc<OrderCounter>) -> Self {
        Self {
            name: name.into(),
            attrs: AttributeStore::default(),
            children: Vec::new(),
            counter,
        }
    }

    /// Creates a child builder sharing this builder's order counter.
    pub fn sub(&self, name: impl Into<String>) -> StoryBuilder {
        StoryBuilder::with_counter(name, Arc::clone(&self.counter))
    }

    /// Binds an action (by name, inline, or a prepared binding).
    ///
    /// Binding a name already bound on this story replaces it.
    pub fn action(mut self, binding: impl Into<ActionBinding>) -> Self {
        let binding = binding.into().sequenced(self.counter.next());
        self.attrs.bind_action(binding);
        self
    }

    /// Binds an anonymous action around `body`, numbered from this builder's
    /// counter.
    pub fn inline_action(self, body: CallbackRef) -> Self {
        let action = Action::anonymous_from(body, &self.counter);
        self.action(action)
    }

    /// Binds an assertion into `bucket`.
    pub fn assertion(mut self, bucket: Bucket, binding: impl Into<AssertionBinding>) -> Self {
        let binding = binding.into().sequenced(self.counter.next());
        self.attrs.bind_assertion(bucket, binding);
        self
    }

    /// Binds an assertion run whatever the expectation is.
    pub fn assert_always(self, binding: impl Into<AssertionBinding>) -> Self {
        self.assertion(Bucket::Always, binding)
    }

    /// Binds an assertion run for `can` stories.
    pub fn assert_can(self, binding: impl Into<AssertionBinding>) -> Self {
        self.assertion(Bucket::Can, binding)
    }

    /// Binds an assertion run for `cannot` stories.
    pub fn assert_cannot(self, binding: impl Into<AssertionBinding>) -> Self {
        self.assertion(Bucket::Cannot, binding)
    }

    /// Sets a callback slot.
    pub fn hook(mut self, hook: Hook, callback: CallbackRef) -> Self {
        self.attrs.set_hook(hook, callback);
        self
    }

    /// Runs `callback` before the actions (after every ancestor's `before`).
    pub fn before(self, callback: CallbackRef) -> Self {
        self.hook(Hook::Before, callback)
    }

    /// Runs `callback` after the actions (after every ancestor's `after`).
    pub fn after(self, callback: CallbackRef) -> Self {
        self.hook(Hook::After, callback)
    }

    /// Sets the set-up hook run first in the boot phase.
    pub fn set_up(self, callback: CallbackRef) -> Self {
        self.hook(Hook::SetUp, callback)
    }

    /// Sets the hook run in the teardown phase.
    pub fn tear_down(self, callback: CallbackRef) -> Self {
        self.hook(Hook::TearDown, callback)
    }

    /// Sets the checker for `can` stories.
    pub fn check_can(self, callback: CallbackRef) -> Self {
        self.hook(Hook::Can, callback)
    }

    /// Sets the checker for `cannot` stories.
    pub fn check_cannot(self, callback: CallbackRef) -> Self {
        self.hook(Hook::Cannot, callback)
    }

    /// Expects the story to succeed.
    pub fn can(mut self) -> Self {
        self.attrs.set_expectation(Expectation::Can);
        self
    }

    /// Expects the story to fail.
    pub fn cannot(mut self) -> Self {
        self.attrs.set_expectation(Expectation::Cannot);
        self
    }

    /// Clears the expectation and stops expectation/assertion inheritance here.
    pub fn reset_expectation(mut self) -> Self {
        self.attrs.reset_expectation();
        self
    }

    /// Adds a tag ordered after everything declared so far.
    pub fn tag(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let order = self.counter.next();
        self.tag_ordered(key, value, order)
    }

    /// Adds a tag with an explicit order.
    pub fn tag_ordered(mut self, key: impl Into<String>, value: impl Into<Value>, order: u64) -> Self {
        self.attrs.set_tag(key.into(), Tag::new(value, order));
        self
    }

    /// Adds a key/value visible to every callback of this subtree.
    pub fn data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.set_data(key.into(), value.into());
        self
    }

    /// Limits the boot phase of this subtree.
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.attrs.set_timeout(Toggle::Enabled(limit));
        self
    }

    /// Explicitly removes any inherited timeout for this subtree.
    pub fn no_timeout(mut self) -> Self {
        self.attrs.set_timeout(Toggle::Disabled);
        self
    }

    /// Marks the subtree for isolated execution.
    ///
    /// Once any story is isolated, only isolated subtrees run; every other
    /// story is skipped.
    pub fn isolated(mut self) -> Self {
        self.attrs.set_isolated();
        self
    }

    /// Appends a child.
    pub fn child(mut self, child: StoryBuilder) -> Self {
        self.children.push(child);
        self
    }

    /// Appends several children.
    pub fn children(mut self, children: impl IntoIterator<Item = StoryBuilder>) -> Self {
        self.children.extend(children);
        self
    }

    /// Freezes the tree.
    pub fn build(self) -> Arc<Story> {
        self.build_under(Weak::new())
    }

    fn build_under(self, parent: Weak<Story>) -> Arc<Story> {
        let StoryBuilder {
            name,
            attrs,
            children,
            ..
        } = self;
        Arc::new_cyclic(|me| {
            let children = children
                .into_iter()
                .map(|child| child.build_under(me.clone()))
                .collect();
            Story::new(name.into(), parent, children, attrs)
        })
    }
}

impl Story {
    /// Creates a builder for a story named `name`.
    pub fn builder(name: impl Into<String>) -> StoryBuilder {
        StoryBuilder::new(name)
    }
}
