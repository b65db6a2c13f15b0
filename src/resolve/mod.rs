//! # Attribute inheritance.
//!
//! - [`Resolver`] - merges a story's lineage into its effective configuration
//! - [`EffectiveConfig`] - the merged result, cached per story
//! - [`ResolvedAction`] - an action binding after lookup and inheritance
//! - [`MergedHooks`] - callbacks after inheritance

mod effective;
mod resolver;

pub use effective::{EffectiveConfig, MergedHooks, ResolvedAction};
pub use resolver::Resolver;
