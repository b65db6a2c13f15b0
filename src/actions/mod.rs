//! # Actions and their bindings.
//!
//! - [`Action`] - a named body with variable, order, repeat count and hooks
//! - [`ActionRef`] - registered name or inline action
//! - [`ActionBinding`] / [`AssertionBinding`] - an action attached to a story with arguments
//! - [`ActionRegistry`] - lookup table for named actions

mod action;
mod binding;
mod registry;

pub use action::Action;
pub use binding::{ActionBinding, ActionRef, AssertionBinding};
pub use registry::ActionRegistry;
