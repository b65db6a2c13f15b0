//! # Display names of stories.
//!
//! A [`Namer`] turns a story and its effective configuration into the name a
//! test harness shows. [`DefaultNamer`] produces:
//!
//! ```text
//! can: login / with valid password [env=prod, slow=true]
//! └┬─┘ └────────────┬────────────┘ └─────────┬─────────┘
//! expectation     lineage            tags, by tag order
//! ```

use crate::resolve::EffectiveConfig;
use crate::story::Story;
use crate::values::Value;

/// Computes display names.
pub trait Namer: Send + Sync + 'static {
    /// Name shown for `story`.
    fn display_name(&self, story: &Story, effective: &EffectiveConfig) -> String;
}

/// Expectation prefix, lineage joined by `" / "`, tag suffix.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultNamer;

impl Namer for DefaultNamer {
    fn display_name(&self, story: &Story, effective: &EffectiveConfig) -> String {
        let mut name = String::new();
        if let Some(expectation) = effective.expectation() {
            name.push_str(expectation.as_label());
            name.push_str(": ");
        }
        name.push_str(&story.path());

        if !effective.tags().is_empty() {
            let tags: Vec<String> = effective
                .tags()
                .iter()
                .map(|(key, tag)| format!("{key}={}", plain(tag.value())))
                .collect();
            name.push_str(" [");
            name.push_str(&tags.join(", "));
            name.push(']');
        }
        name
    }
}

/// Strings without quotes, everything else as JSON.
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::actions::ActionRegistry;
    use crate::resolve::Resolver;

    #[test]
    fn default_name_has_expectation_lineage_and_tags() {
        let root = Story::builder("login")
            .tag_ordered("env", "prod", 2)
            .child(
                Story::builder("with valid password")
                    .can()
                    .tag_ordered("slow", true, 1),
            )
            .child(Story::builder("untagged expectation-less"))
            .build();
        let resolver = Resolver::new(Arc::new(ActionRegistry::new()));

        let leaf = &root.children()[0];
        let name = DefaultNamer.display_name(leaf, &resolver.resolve_partial(leaf));
        assert_eq!(name, "can: login / with valid password [slow=true, env=prod]");

        let bare = &root.children()[1];
        let name = DefaultNamer.display_name(bare, &resolver.resolve_partial(bare));
        assert_eq!(name, "login / untagged expectation-less [env=prod]");
    }
}
