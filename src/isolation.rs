//! # Isolation registry.
//!
//! Tracks which stories were marked for isolated execution. As long as the
//! registry is empty every story runs; once it holds at least one story, only
//! stories inside a marked subtree run and all others are skipped.
//!
//! ```text
//! registry empty ──────────────────────────────► run everything
//! registry non-empty
//!   ├─► story or an ancestor is marked ────────► run
//!   └─► otherwise ─────────────────────────────► skip
//! ```
//!
//! ## Rules
//! - Marking is idempotent
//! - The registry is shared: an orchestrator and every suite it runs see the
//!   same set (use [`IsolationRegistry::global`] for a process-wide one)
//! - [`flush`](IsolationRegistry::flush) clears all marks; call it between
//!   independent runs that reuse a registry

use std::collections::HashSet;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::story::{Story, StoryId};

static GLOBAL: OnceLock<Arc<IsolationRegistry>> = OnceLock::new();

/// Set of stories marked for isolated execution.
#[derive(Debug, Default)]
pub struct IsolationRegistry {
    ids: RwLock<HashSet<StoryId>>,
}

impl IsolationRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry.
    pub fn global() -> Arc<IsolationRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(IsolationRegistry::new())))
    }

    /// Marks `story` (and thereby its subtree) as isolated.
    ///
    /// Returns false if it was already marked.
    pub fn mark_isolated(&self, story: &Story) -> bool {
        self.ids
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(story.id())
    }

    /// Marks every story of the tree that was built with
    /// [`isolated`](crate::StoryBuilder::isolated); returns how many were newly marked.
    pub fn register_tree(&self, root: &Arc<Story>) -> usize {
        root.descendants()
            .iter()
            .filter(|s| s.attributes().is_isolated())
            .filter(|s| self.mark_isolated(s))
            .count()
    }

    /// True once any story is marked.
    pub fn is_enabled(&self) -> bool {
        !self.ids.read().unwrap_or_else(PoisonError::into_inner).is_empty()
    }

    /// True if `story` itself is marked.
    pub fn is_marked(&self, story: &Story) -> bool {
        self.ids
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&story.id())
    }

    /// True if `story` or one of its ancestors is marked.
    pub fn is_in_scope(&self, story: &Story) -> bool {
        let ids = self.ids.read().unwrap_or_else(PoisonError::into_inner);
        ids.contains(&story.id()) || story.ancestors().iter().any(|a| ids.contains(&a.id()))
    }

    /// Whether `story` must be skipped under the current marks.
    pub fn should_skip(&self, story: &Story) -> bool {
        self.is_enabled() && !self.is_in_scope(story)
    }

    /// Removes every mark.
    pub fn flush(&self) {
        self.ids.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Number of marked stories.
    pub fn len(&self) -> usize {
        self.ids.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if nothing is marked.
    pub fn is_empty(&self) -> bool {
        !self.is_enabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Arc<Story> {
        Story::builder("root")
            .child(
                Story::builder("a")
                    .child(Story::builder("a1"))
                    .child(Story::builder("a2")),
            )
            .child(Story::builder("b"))
            .build()
    }

    #[test]
    fn empty_registry_skips_nothing() {
        let reg = IsolationRegistry::new();
        let root = tree();
        assert!(root.descendants().iter().all(|s| !reg.should_skip(s)));
    }

    #[test]
    fn only_marked_subtrees_run_once_enabled() {
        let reg = IsolationRegistry::new();
        let root = tree();
        let a = Arc::clone(&root.children()[0]);
        let b = Arc::clone(&root.children()[1]);

        assert!(reg.mark_isolated(&a));
        assert!(!reg.mark_isolated(&a));

        assert!(!reg.should_skip(&a));
        assert!(!reg.should_skip(&a.children()[0]));
        assert!(!reg.should_skip(&a.children()[1]));
        assert!(reg.should_skip(&b));
        assert!(reg.should_skip(&root));
        assert!(reg.is_marked(&a));
        assert!(!reg.is_marked(&a.children()[0]));
        assert!(reg.is_in_scope(&a.children()[0]));
    }

    #[test]
    fn register_tree_picks_up_builder_marks_and_flush_clears() {
        let root = Story::builder("root")
            .child(Story::builder("focused").isolated())
            .child(Story::builder("other"))
            .build();
        let reg = IsolationRegistry::new();

        assert_eq!(reg.register_tree(&root), 1);
        assert_eq!(reg.register_tree(&root), 0);
        assert_eq!(reg.len(), 1);
        assert!(reg.should_skip(&root.children()[1]));

        reg.flush();
        assert!(reg.is_empty());
        assert!(!reg.should_skip(&root.children()[1]));
    }
}
