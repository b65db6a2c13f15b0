//! # storyvisor
//!
//! **Storyvisor** composes families of test scenarios from a tree of
//! inheritable story fragments and runs each leaf through an ordered lifecycle.
//!
//! A story declares only what differs from its parent: actions, assertions,
//! hooks, tags, data, a timeout, an isolation mark and an expectation. Every
//! leaf inherits the rest from its ancestors and becomes one runnable case.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌───────────────────────── Story tree ──────────────────────────┐
//!     │  login (actions, data, can-checker)                           │
//!     │   ├── with valid password   (can)                             │
//!     │   └── with wrong password   (cannot, extra assertion)         │
//!     └───────────────────────────────┬───────────────────────────────┘
//!                                     ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Suite                                                            │
//! │  - IsolationRegistry (marks isolated subtrees)                    │
//! │  - Namer (one display name per leaf)                              │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────────────────────────────────────────────────────┐
//!     │  Orchestrator (one leaf at a time, or up to max_concurrent)  │
//!     │  - Resolver (lineage merge, cached per story)                │
//!     │  - TimeoutSupervisor (boot phase limit)                      │
//!     │  - Invoke (callback binding seam)                            │
//!     └───────┬──────────────────────────────────────────────────────┘
//!             │ Publishes StoryStarting, PhaseStarting, ActionInvoked,
//!             │ TimeoutHit, StoryPassed / StorySkipped / StoryFailed
//!             ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                   (capacity: Config::bus_capacity)                │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │   suite forwarder      │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                            (per-sub queues)
//!                        ┌──────────┼──────────┐
//!                        ▼          ▼          ▼
//!                    LogWriter   Recorder    custom
//! ```
//!
//! ### Lifecycle
//! ```text
//! Inherit ──► Register ──► Boot ──► Assert ──► Teardown
//!    │                       │         │           ▲
//!    └── isolation skip ─────┴─────────┴─ error ───┘ (teardown always runs)
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Stories**       | Declare a tree of inheritable scenario fragments.            | [`Story`], [`StoryBuilder`]                 |
//! | **Actions**       | Named or inline steps, ordered, repeated, shared by name.    | [`Action`], [`ActionBinding`], [`ActionRegistry`] |
//! | **Callbacks**     | Async or sync closures with a value scope.                   | [`Callback`], [`CallbackFn`], [`SyncFn`]    |
//! | **Resolution**    | Merge a lineage into one effective configuration.            | [`Resolver`], [`EffectiveConfig`]           |
//! | **Running**       | Drive a story through its phases, run whole trees.           | [`Orchestrator`], [`Suite`]                 |
//! | **Subscriber API**| Hook into lifecycle events (logging, recording, custom).     | [`Subscribe`], [`Recorder`]                 |
//! | **Errors**        | Typed errors for declaration mistakes and failures.          | [`StoryError`], [`CallbackError`]           |
//! | **Configuration** | Centralize runtime settings.                                 | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging` (default): exports the built-in [`LogWriter`] subscriber.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use serde_json::json;
//! use storyvisor::{
//!     Action, CallbackError, CallbackFn, Config, IsolationRegistry, Scope, Story, Suite, SyncFn,
//!     Verdict,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let login = CallbackFn::arc("login", |scope: Scope| async move {
//!         let password: String = scope.get("password")?;
//!         Ok::<_, CallbackError>(json!(password == "secret"))
//!     });
//!     let accepted = SyncFn::arc("accepted", |scope: &Scope| {
//!         match scope.result_as::<bool>()? {
//!             true => Ok(json!(true)),
//!             false => Err(CallbackError::new("login rejected")),
//!         }
//!     });
//!     let rejected = SyncFn::arc("rejected", |scope: &Scope| {
//!         match scope.result_as::<bool>()? {
//!             false => Ok(json!(true)),
//!             true => Err(CallbackError::new("login accepted")),
//!         }
//!     });
//!
//!     let root = Story::builder("login")
//!         .action(Action::new("login", login))
//!         .timeout(Duration::from_secs(5))
//!         .check_can(accepted)
//!         .check_cannot(rejected)
//!         .child(Story::builder("with valid password").can().data("password", "secret"))
//!         .child(Story::builder("with wrong password").cannot().data("password", "guess"))
//!         .build();
//!
//!     let suite = Suite::builder(Config::default())
//!         .with_isolation(Arc::new(IsolationRegistry::new()))
//!         .build();
//!     let report = suite.run(&root).await;
//!
//!     for case in report.cases() {
//!         assert_eq!(case.verdict(), Verdict::Passed, "{}", case.name());
//!     }
//! }
//! ```
mod actions;
mod callbacks;
mod config;
mod core;
mod error;
mod events;
mod isolation;
mod order;
mod resolve;
mod story;
mod subscribers;
mod timeout;
mod values;

// ---- Public re-exports ----

pub use actions::{Action, ActionBinding, ActionRef, ActionRegistry, AssertionBinding};
pub use callbacks::{
    BoxCallbackFuture, Callback, CallbackFn, CallbackRef, DirectInvoker, Invoke, SyncFn,
};
pub use config::{Config, TimeoutMode};
pub use core::{
    Case, CaseReport, DefaultNamer, Namer, Orchestrator, OrchestratorBuilder, Phase, Status,
    Suite, SuiteBuilder, SuiteReport, Summary, Verdict,
};
pub use error::{CallbackError, StoryError, TimedOut};
pub use events::{Bus, Event, EventKind};
pub use isolation::IsolationRegistry;
pub use order::OrderCounter;
pub use resolve::{EffectiveConfig, MergedHooks, ResolvedAction, Resolver};
pub use story::{
    AttributeStore, Bucket, Expectation, Hook, Hooks, ResultHolder, Story, StoryBuilder, StoryId,
    Tag, Toggle,
};
pub use subscribers::{Recorder, Subscribe, SubscriberSet};
pub use timeout::TimeoutSupervisor;
pub use values::{Scope, Value, Values};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging` (on by default)
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
