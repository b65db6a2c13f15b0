//! # Inheritance resolver.
//!
//! Computes a story's [`EffectiveConfig`] from its lineage (root → story).
//! Every attribute family has its own rule:
//!
//! ```text
//! family       walk            rule
//! ──────────── ─────────────── ───────────────────────────────────────────────
//! actions      root → story    keyed by name, deeper level wins; run order is
//!                              (order, seq), not override order
//! assertions   halt → story    same as actions, per bucket; resolved lazily at
//!                              assert time for `always` + the expected bucket
//! before/after root → story    composed: one entry per level, outermost first
//! other hooks  story → root    nearest non-empty slot wins
//! tags, data   root → story    keyed, deeper level wins, ancestor position kept;
//!                              tags finally sorted by tag order
//! timeout      story → root    first explicit setting wins (on or off)
//! expectation  story → root    first level with a value or a halt wins; a halt
//!                              without a value resolves to "unspecified"
//! ```
//!
//! Isolation is not part of the effective configuration: it depends on the
//! [`IsolationRegistry`](crate::IsolationRegistry), which the orchestrator
//! consults live.
//!
//! ## Rules
//! - Resolution is cached on the story; resolving twice returns the same `Arc`
//! - Named actions are looked up in the [`ActionRegistry`]; a missing name fails
//!   the resolution of that story only

use std::iter;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::actions::{ActionBinding, ActionRef, ActionRegistry};
use crate::error::StoryError;
use crate::resolve::effective::{EffectiveConfig, MergedHooks, ResolvedAction};
use crate::story::{AttributeStore, Bucket, Expectation, Hook, Story, Toggle};
use crate::values::Values;

/// Which binding list of an [`AttributeStore`] is merged.
#[derive(Clone, Copy, Debug)]
enum Slot {
    Actions,
    Assertions(Bucket),
}

impl Slot {
    fn bindings(self, attrs: &AttributeStore) -> &[ActionBinding] {
        match self {
            Slot::Actions => attrs.actions(),
            Slot::Assertions(bucket) => attrs.assertions(bucket),
        }
    }

    fn unknown(self, story: &Story, name: &str) -> StoryError {
        match self {
            Slot::Actions => StoryError::UnknownAction {
                story: story.path(),
                name: name.to_string(),
            },
            Slot::Assertions(_) => StoryError::UnknownAssertion {
                story: story.path(),
                name: name.to_string(),
            },
        }
    }
}

/// Merges story attributes along the ancestor chain.
#[derive(Clone, Debug)]
pub struct Resolver {
    registry: Arc<ActionRegistry>,
}

impl Resolver {
    /// Creates a resolver looking named actions up in `registry`.
    pub fn new(registry: Arc<ActionRegistry>) -> Self {
        Self { registry }
    }

    /// The registry used for named actions.
    pub fn registry(&self) -> &Arc<ActionRegistry> {
        &self.registry
    }

    /// Returns the story's effective configuration, computing it on first use.
    pub fn resolve(&self, story: &Story) -> Result<Arc<EffectiveConfig>, StoryError> {
        if let Some(effective) = story.effective() {
            return Ok(effective);
        }
        let effective = with_lineage(story, |levels| -> Result<EffectiveConfig, StoryError> {
            Ok(EffectiveConfig {
                actions: self.merge_bindings(story, levels, Slot::Actions)?,
                ..merge_infallible(levels)
            })
        })?;
        Ok(story.cache_effective(Arc::new(effective)))
    }

    /// Resolves everything except actions; never fails and is not cached.
    ///
    /// Used where a story must be described or torn down even though its
    /// actions could not be resolved (or were never needed).
    pub fn resolve_partial(&self, story: &Story) -> EffectiveConfig {
        with_lineage(story, merge_infallible)
    }

    /// Assertions that apply under `expectation`: the `always` bucket, then the
    /// expected bucket, each merged from the nearest halt down to the story.
    pub fn assertions(
        &self,
        story: &Story,
        expectation: Expectation,
    ) -> Result<Vec<ResolvedAction>, StoryError> {
        with_lineage(story, |levels| {
            let start = levels
                .iter()
                .rposition(|s| s.attributes().expectation_halt())
                .unwrap_or(0);
            let levels = &levels[start..];

            let mut out = self.merge_bindings(story, levels, Slot::Assertions(Bucket::Always))?;
            out.extend(self.merge_bindings(
                story,
                levels,
                Slot::Assertions(expectation.bucket()),
            )?);
            Ok(out)
        })
    }

    fn merge_bindings(
        &self,
        story: &Story,
        levels: &[&Story],
        slot: Slot,
    ) -> Result<Vec<ResolvedAction>, StoryError> {
        let mut merged: IndexMap<&str, &ActionBinding> = IndexMap::new();
        for level in levels {
            for binding in slot.bindings(level.attributes()) {
                merged.insert(binding.name(), binding);
            }
        }

        let mut out = merged
            .into_values()
            .map(|binding| self.lookup(story, binding, slot))
            .collect::<Result<Vec<_>, _>>()?;
        out.sort_by_key(ResolvedAction::sort_key);
        Ok(out)
    }

    fn lookup(
        &self,
        story: &Story,
        binding: &ActionBinding,
        slot: Slot,
    ) -> Result<ResolvedAction, StoryError> {
        let action = match binding.action() {
            ActionRef::Inline(action) => Arc::clone(action),
            ActionRef::Named(name) => self
                .registry
                .get(name)
                .ok_or_else(|| slot.unknown(story, name))?,
        };
        let order = binding
            .order()
            .or(action.order())
            .unwrap_or(binding.seq());
        Ok(ResolvedAction::new(
            action,
            binding.arguments().clone(),
            order,
            binding.seq(),
        ))
    }
}

/// Calls `f` with the lineage of `story`, root first, story last.
fn with_lineage<R>(story: &Story, f: impl FnOnce(&[&Story]) -> R) -> R {
    let ancestors = story.ancestors();
    let levels: Vec<&Story> = ancestors
        .iter()
        .rev()
        .map(Arc::as_ref)
        .chain(iter::once(story))
        .collect();
    f(&levels)
}

fn merge_infallible(levels: &[&Story]) -> EffectiveConfig {
    EffectiveConfig {
        actions: Vec::new(),
        hooks: merge_hooks(levels),
        tags: merge_tags(levels),
        data: merge_data(levels),
        timeout: resolve_timeout(levels),
        expectation: resolve_expectation(levels),
    }
}

fn merge_hooks(levels: &[&Story]) -> MergedHooks {
    let composed = |hook: Hook| {
        levels
            .iter()
            .filter_map(|s| s.attributes().hooks().get(hook).cloned())
            .collect::<Vec<_>>()
    };
    let nearest = |hook: Hook| {
        levels
            .iter()
            .rev()
            .find_map(|s| s.attributes().hooks().get(hook).cloned())
    };

    MergedHooks {
        before: composed(Hook::Before),
        after: composed(Hook::After),
        set_up: nearest(Hook::SetUp),
        tear_down: nearest(Hook::TearDown),
        can: nearest(Hook::Can),
        cannot: nearest(Hook::Cannot),
    }
}

fn merge_tags(levels: &[&Story]) -> IndexMap<String, crate::story::Tag> {
    let mut tags = IndexMap::new();
    for level in levels {
        for (key, tag) in level.attributes().tags() {
            tags.insert(key.clone(), tag.clone());
        }
    }
    tags.sort_by(|_, a, _, b| a.order().cmp(&b.order()));
    tags
}

fn merge_data(levels: &[&Story]) -> Values {
    let mut data = Values::new();
    for level in levels {
        for (key, value) in level.attributes().data() {
            data.insert(key.clone(), value.clone());
        }
    }
    data
}

fn resolve_timeout(levels: &[&Story]) -> Toggle<std::time::Duration> {
    levels
        .iter()
        .rev()
        .map(|s| s.attributes().timeout())
        .find(|t| t.is_set())
        .unwrap_or_default()
}

fn resolve_expectation(levels: &[&Story]) -> Option<Expectation> {
    levels
        .iter()
        .rev()
        .map(|s| s.attributes())
        .find(|a| a.expectation_halt() || a.expectation().is_some())
        .and_then(AttributeStore::expectation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;

    use crate::actions::Action;
    use crate::callbacks::{CallbackRef, SyncFn};
    use crate::order::OrderCounter;
    use crate::story::StoryBuilder;
    use crate::values::{Scope, Value};

    fn noop(name: &'static str) -> CallbackRef {
        SyncFn::arc(name, |_scope: &Scope| Ok(Value::Null))
    }

    fn registry() -> Arc<ActionRegistry> {
        let reg = ActionRegistry::new();
        reg.register(Action::new("open", noop("open")));
        reg.register(Action::new("login", noop("login")));
        reg.register(Action::new("logout", noop("logout")).with_order(1_000));
        Arc::new(reg)
    }

    fn builder(name: &str, counter: &Arc<OrderCounter>) -> StoryBuilder {
        StoryBuilder::with_counter(name, Arc::clone(counter))
    }

    fn leaf(root: &Arc<Story>, path: &[usize]) -> Arc<Story> {
        let mut cur = Arc::clone(root);
        for &i in path {
            cur = Arc::clone(&cur.children()[i]);
        }
        cur
    }

    fn names(actions: &[ResolvedAction]) -> Vec<&str> {
        actions.iter().map(|a| a.action().name()).collect()
    }

    #[test]
    fn descendant_overrides_ancestor_action_arguments() {
        let c = Arc::new(OrderCounter::new());
        let root = builder("root", &c)
            .action(ActionBinding::new("login").with_argument("user", "root"))
            .action("open")
            .child(
                builder("child", &c)
                    .action(ActionBinding::new("login").with_argument("user", "child")),
            )
            .build();

        let resolver = Resolver::new(registry());
        let eff = resolver.resolve(&leaf(&root, &[0])).expect("resolves");

        let logins: Vec<_> = eff
            .actions()
            .iter()
            .filter(|a| a.action().name() == "login")
            .collect();
        assert_eq!(logins.len(), 1);
        assert_eq!(logins[0].arguments()["user"], json!("child"));
    }

    #[test]
    fn execution_order_follows_order_field_not_override_depth() {
        let c = Arc::new(OrderCounter::new());
        let root = builder("root", &c)
            .action("logout") // action order 1000
            .action("open") // seq 2
            .child(builder("child", &c).action("login")) // seq 3
            .build();

        let resolver = Resolver::new(registry());
        let eff = resolver.resolve(&leaf(&root, &[0])).expect("resolves");
        assert_eq!(names(eff.actions()), vec!["open", "login", "logout"]);
    }

    #[test]
    fn explicit_binding_order_beats_action_order_and_ties_use_seq() {
        let c = Arc::new(OrderCounter::new());
        let root = builder("root", &c)
            .action(ActionBinding::new("logout").with_order(5))
            .action(ActionBinding::new("open").with_order(5))
            .action(ActionBinding::new("login").with_order(1))
            .build();

        let eff = Resolver::new(registry()).resolve(&root).expect("resolves");
        assert_eq!(names(eff.actions()), vec!["login", "logout", "open"]);
    }

    #[test]
    fn resolution_is_cached_and_deterministic() {
        let c = Arc::new(OrderCounter::new());
        let root = builder("root", &c)
            .action("open")
            .child(builder("child", &c).action("login").action("open"))
            .build();
        let child = leaf(&root, &[0]);
        let resolver = Resolver::new(registry());

        let a = resolver.resolve(&child).expect("resolves");
        let b = resolver.resolve(&child).expect("resolves");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.actions().len(), 2);

        let fresh = resolver.resolve_partial(&child);
        assert_eq!(fresh.expectation(), a.expectation());
    }

    #[test]
    fn unknown_named_action_is_a_lookup_error() {
        let root = Story::builder("root").action("missing").build();
        let err = Resolver::new(registry()).resolve(&root).expect_err("must fail");
        assert!(matches!(err, StoryError::UnknownAction { ref name, .. } if name == "missing"));
        assert!(root.effective().is_none());
    }

    #[test]
    fn before_and_after_compose_outermost_first_other_hooks_nearest_wins() {
        let root = Story::builder("root")
            .before(noop("before-root"))
            .after(noop("after-root"))
            .tear_down(noop("td-root"))
            .check_can(noop("can-root"))
            .child(
                Story::builder("mid")
                    .before(noop("before-mid"))
                    .check_can(noop("can-mid"))
                    .child(Story::builder("leaf").after(noop("after-leaf"))),
            )
            .build();

        let eff = Resolver::new(registry())
            .resolve(&leaf(&root, &[0, 0]))
            .expect("resolves");
        let before: Vec<&str> = eff.hooks().before().iter().map(|c| c.name()).collect();
        let after: Vec<&str> = eff.hooks().after().iter().map(|c| c.name()).collect();
        assert_eq!(before, vec!["before-root", "before-mid"]);
        assert_eq!(after, vec!["after-root", "after-leaf"]);
        assert_eq!(eff.hooks().get(Hook::TearDown).map(|c| c.name()), Some("td-root"));
        assert_eq!(eff.hooks().checker(Expectation::Can).map(|c| c.name()), Some("can-mid"));
        assert!(eff.hooks().checker(Expectation::Cannot).is_none());
    }

    #[test]
    fn tags_override_by_key_and_sort_by_order() {
        let root = Story::builder("root")
            .tag_ordered("env", "staging", 20)
            .tag_ordered("team", "auth", 10)
            .child(Story::builder("leaf").tag_ordered("env", "prod", 30).tag_ordered("slow", true, 5))
            .data("user", "alice")
            .build();

        let eff = Resolver::new(registry())
            .resolve(&leaf(&root, &[0]))
            .expect("resolves");
        let keys: Vec<&str> = eff.tags().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["slow", "team", "env"]);
        assert_eq!(eff.tags()["env"].value(), &json!("prod"));
        assert_eq!(eff.data()["user"], json!("alice"));
    }

    #[test]
    fn timeout_is_first_explicit_setting_upward() {
        let root = Story::builder("root")
            .timeout(Duration::from_secs(1))
            .child(Story::builder("inherits"))
            .child(Story::builder("overrides").timeout(Duration::from_secs(3)))
            .child(
                Story::builder("disabled")
                    .no_timeout()
                    .child(Story::builder("below-disabled")),
            )
            .build();
        let resolver = Resolver::new(registry());
        let timeout = |path: &[usize]| resolver.resolve_partial(&leaf(&root, path)).timeout();

        assert_eq!(timeout(&[0]), Some(Duration::from_secs(1)));
        assert_eq!(timeout(&[1]), Some(Duration::from_secs(3)));
        assert_eq!(timeout(&[2]), None);
        assert_eq!(timeout(&[2, 0]), None);
        assert_eq!(
            resolver.resolve_partial(&leaf(&root, &[2, 0])).timeout_setting(),
            Toggle::Disabled
        );

        let bare = Story::builder("bare").build();
        assert_eq!(resolver.resolve_partial(&bare).timeout_setting(), Toggle::Unset);
    }

    #[test]
    fn reset_expectation_halts_upward_search() {
        let root = Story::builder("grand")
            .can()
            .child(
                Story::builder("parent")
                    .reset_expectation()
                    .child(Story::builder("child"))
                    .child(Story::builder("closer").cannot()),
            )
            .child(Story::builder("sibling"))
            .build();
        let resolver = Resolver::new(registry());
        let expectation = |path: &[usize]| resolver.resolve_partial(&leaf(&root, path)).expectation();

        assert_eq!(expectation(&[0]), None);
        assert_eq!(expectation(&[0, 0]), None);
        assert_eq!(expectation(&[0, 1]), Some(Expectation::Cannot));
        assert_eq!(expectation(&[1]), Some(Expectation::Can));
    }

    #[test]
    fn assertions_are_always_then_expected_bucket_top_down() {
        let reg = ActionRegistry::new();
        for name in ["a-can", "b-always", "c-cannot", "d-always-child", "e-can-child"] {
            reg.register(Action::new(name, noop(name)));
        }
        let c = Arc::new(OrderCounter::new());
        let root = builder("parent", &c)
            .assert_can("a-can")
            .assert_always("b-always")
            .assert_cannot("c-cannot")
            .child(
                builder("child", &c)
                    .can()
                    .assert_always("d-always-child")
                    .assert_can("e-can-child"),
            )
            .build();

        let resolver = Resolver::new(Arc::new(reg));
        let got = resolver
            .assertions(&leaf(&root, &[0]), Expectation::Can)
            .expect("resolves");
        assert_eq!(names(&got), vec!["b-always", "d-always-child", "a-can", "e-can-child"]);
    }

    #[test]
    fn assertions_stop_at_halt() {
        let reg = ActionRegistry::new();
        reg.register(Action::new("above", noop("above")));
        reg.register(Action::new("below", noop("below")));
        let root = Story::builder("grand")
            .assert_always("above")
            .child(
                Story::builder("parent")
                    .reset_expectation()
                    .can()
                    .assert_always("below"),
            )
            .build();

        let got = Resolver::new(Arc::new(reg))
            .assertions(&leaf(&root, &[0]), Expectation::Can)
            .expect("resolves");
        assert_eq!(names(&got), vec!["below"]);
    }

    #[test]
    fn unknown_assertion_is_reported_separately() {
        let root = Story::builder("root").can().assert_can("ghost").build();
        let err = Resolver::new(registry())
            .assertions(&root, Expectation::Can)
            .expect_err("must fail");
        assert_eq!(err.as_label(), "story_unknown_assertion");
    }
}
