//! # Story tree.
//!
//! - [`Story`] - tree node: owned children, weak parent, local attributes, run state
//! - [`StoryBuilder`] - fluent construction of a whole tree
//! - [`AttributeStore`] - local, pre-inheritance declarations of one story
//! - [`ResultHolder`] - latest value / error of a story
//! - [`Expectation`], [`Toggle`], [`Bucket`], [`Hook`], [`Tag`] - attribute vocabulary

mod attributes;
mod builder;
mod node;
mod result;

pub use attributes::{AttributeStore, Bucket, Expectation, Hook, Hooks, Tag, Toggle};
pub use builder::StoryBuilder;
pub use node::{Story, StoryId};
pub use result::ResultHolder;
