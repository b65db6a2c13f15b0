//! Runtime core: the story lifecycle and suites.
//!
//! The public API of this module is [`Orchestrator`], which drives one story
//! through its phases, and [`Suite`], which runs every leaf of a tree.
//!
//! Internal modules:
//! - [`phase`]: lifecycle phases and run statuses;
//! - [`orchestrator`]: inherit, register, boot, assert and teardown for one story;
//! - [`builder`]: wires an orchestrator from injectable collaborators;
//! - [`naming`]: display names of cases;
//! - [`suite`]: turns a tree into cases, runs them and reports verdicts.

mod builder;
mod naming;
mod orchestrator;
mod phase;
mod suite;

pub use builder::OrchestratorBuilder;
pub use naming::{DefaultNamer, Namer};
pub use orchestrator::Orchestrator;
pub use phase::{Phase, Status};
pub use suite::{Case, CaseReport, Suite, SuiteBuilder, SuiteReport, Summary, Verdict};
