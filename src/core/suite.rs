//! # Suite: turns a story tree into runnable cases.
//!
//! A [`Suite`] is the registration shim between a story tree and whatever
//! reports results: it registers the tree's isolation marks, produces one
//! [`Case`] per leaf under its display name, runs them through an
//! [`Orchestrator`] and maps outcomes to [`Verdict`]s.
//!
//! ## Architecture
//! ```text
//! Suite::run(root)
//!   ├─► IsolationRegistry::register_tree(root)
//!   ├─► cases(root): one Case per leaf, named by the Namer
//!   ├─► forwarder: Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!   ├─► publish SuiteStarting
//!   ├─► per case (at most `max_concurrent` at a time):
//!   │     acquire permit ─► JoinSet::spawn(orchestrator.run(leaf))
//!   ├─► join all; panics become StoryError::Panicked
//!   ├─► publish SuiteFinished
//!   └─► stop forwarder, drain subscriber queues ─► SuiteReport
//! ```
//!
//! ## Verdicts
//! ```text
//! Ok(Passed)                         → Passed
//! Ok(Skipped)                        → Skipped
//! Err(e) if e.is_configuration()     → Incomplete
//! Err(_)                             → Failed
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use storyvisor::{Action, Config, IsolationRegistry, Scope, Story, Suite, SyncFn, Value, Verdict};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let ok = SyncFn::arc("ok", |_scope: &Scope| Ok(Value::Null));
//! let root = Story::builder("checkout")
//!     .action(Action::new("pay", ok.clone()))
//!     .check_can(ok)
//!     .child(Story::builder("with a card").can())
//!     .build();
//!
//! let suite = Suite::builder(Config::default())
//!     .with_isolation(Arc::new(IsolationRegistry::new()))
//!     .build();
//! let report = suite.run(&root).await;
//!
//! assert_eq!(report.cases()[0].name(), "can: checkout / with a card");
//! assert_eq!(report.cases()[0].verdict(), Verdict::Passed);
//! assert!(report.is_success());
//! # }
//! ```

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, broadcast};
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    actions::ActionRegistry,
    callbacks::Invoke,
    config::Config,
    error::StoryError,
    events::{Bus, Event, EventKind},
    isolation::IsolationRegistry,
    story::Story,
    subscribers::{Subscribe, SubscriberSet, panic_message},
};

use super::builder::OrchestratorBuilder;
use super::naming::{DefaultNamer, Namer};
use super::orchestrator::Orchestrator;
use super::phase::Status;

/// Reported result of one case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The story ran and its expectation held.
    Passed,
    /// The story ran and failed (callback error, timeout, lookup, panic).
    Failed,
    /// Isolation excluded the story.
    Skipped,
    /// The story is declared incompletely (no action, expectation or checker).
    Incomplete,
}

impl Verdict {
    /// Maps a story outcome to a verdict.
    pub fn of(outcome: &Result<Status, StoryError>) -> Verdict {
        match outcome {
            Ok(Status::Passed) => Verdict::Passed,
            Ok(Status::Skipped) => Verdict::Skipped,
            Err(e) if e.is_configuration() => Verdict::Incomplete,
            Err(_) => Verdict::Failed,
        }
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Passed => "passed",
            Verdict::Failed => "failed",
            Verdict::Skipped => "skipped",
            Verdict::Incomplete => "incomplete",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A leaf story under its display name.
#[derive(Clone, Debug)]
pub struct Case {
    name: String,
    story: Arc<Story>,
}

impl Case {
    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The leaf story.
    pub fn story(&self) -> &Arc<Story> {
        &self.story
    }
}

/// Outcome of one case.
#[derive(Clone, Debug)]
pub struct CaseReport {
    name: String,
    verdict: Verdict,
    error: Option<StoryError>,
}

impl CaseReport {
    /// Display name of the case.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Verdict.
    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// The error, unless the case passed or was skipped.
    pub fn error(&self) -> Option<&StoryError> {
        self.error.as_ref()
    }
}

/// Verdict counts of a suite run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub incomplete: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "passed={} failed={} skipped={} incomplete={}",
            self.passed, self.failed, self.skipped, self.incomplete
        )
    }
}

/// Outcome of a suite run, cases in depth-first leaf order.
#[derive(Clone, Debug)]
pub struct SuiteReport {
    cases: Vec<CaseReport>,
    elapsed: Duration,
}

impl SuiteReport {
    /// Every case, in depth-first leaf order.
    pub fn cases(&self) -> &[CaseReport] {
        &self.cases
    }

    /// Looks a case up by display name.
    pub fn case(&self, name: &str) -> Option<&CaseReport> {
        self.cases.iter().find(|c| c.name == name)
    }

    /// Verdict counts.
    pub fn summary(&self) -> Summary {
        let mut s = Summary::default();
        for case in &self.cases {
            match case.verdict {
                Verdict::Passed => s.passed += 1,
                Verdict::Failed => s.failed += 1,
                Verdict::Skipped => s.skipped += 1,
                Verdict::Incomplete => s.incomplete += 1,
            }
        }
        s
    }

    /// True if nothing failed and nothing was incomplete.
    pub fn is_success(&self) -> bool {
        let s = self.summary();
        s.failed == 0 && s.incomplete == 0
    }

    /// Wall time of the whole run.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Runs every leaf of a story tree and reports verdicts.
pub struct Suite {
    orch: Arc<Orchestrator>,
    namer: Arc<dyn Namer>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    limit: Option<usize>,
}

impl Suite {
    /// Creates a builder.
    pub fn builder(cfg: Config) -> SuiteBuilder {
        SuiteBuilder::new(cfg)
    }

    /// The orchestrator cases run on.
    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orch
    }

    /// One case per leaf of `root`, depth-first.
    ///
    /// Names use the effective configuration; a leaf whose actions cannot be
    /// resolved is still named (the lookup error surfaces when it runs).
    pub fn cases(&self, root: &Arc<Story>) -> Vec<Case> {
        let resolver = self.orch.resolver();
        root.leaves()
            .into_iter()
            .map(|story| {
                let name = match resolver.resolve(&story) {
                    Ok(effective) => self.namer.display_name(&story, &effective),
                    Err(_) => self
                        .namer
                        .display_name(&story, &resolver.resolve_partial(&story)),
                };
                Case { name, story }
            })
            .collect()
    }

    /// Runs every leaf of `root`.
    pub async fn run(&self, root: &Arc<Story>) -> SuiteReport {
        let started = Instant::now();
        let marked = self.orch.isolation().register_tree(root);
        if marked > 0 {
            tracing::debug!(story = %root.path(), marked, "isolation marks registered");
        }

        let cases = self.cases(root);
        let bus = self.orch.bus().clone();
        let stop = CancellationToken::new();
        let forwarder = tokio::spawn(forward(
            bus.subscribe(),
            SubscriberSet::new(self.subscribers.clone(), bus.clone()),
            stop.clone(),
        ));

        bus.publish(
            Event::new(EventKind::SuiteStarting)
                .with_story(root.path())
                .with_reason(cases.len().to_string()),
        );

        let results = self.run_cases(&cases).await;
        let reports: Vec<CaseReport> = cases
            .into_iter()
            .zip(results)
            .map(|(case, outcome)| CaseReport {
                verdict: Verdict::of(&outcome),
                error: outcome.err(),
                name: case.name,
            })
            .collect();

        let report = SuiteReport {
            cases: reports,
            elapsed: started.elapsed(),
        };
        bus.publish(
            Event::new(EventKind::SuiteFinished)
                .with_story(root.path())
                .with_elapsed(report.elapsed)
                .with_reason(report.summary().to_string()),
        );

        stop.cancel();
        settle_forwarder(forwarder.await);
        report
    }

    /// Runs the cases, returning outcomes in case order.
    async fn run_cases(&self, cases: &[Case]) -> Vec<Result<Status, StoryError>> {
        let semaphore = self.limit.map(|n| Arc::new(Semaphore::new(n)));
        let mut set = JoinSet::new();

        for (index, case) in cases.iter().enumerate() {
            let permit = match &semaphore {
                Some(sem) => Arc::clone(sem).acquire_owned().await.ok(),
                None => None,
            };
            let orch = Arc::clone(&self.orch);
            let story = Arc::clone(&case.story);
            set.spawn(async move {
                let _permit = permit;
                let outcome = AssertUnwindSafe(orch.run(&story)).catch_unwind().await;
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<Result<Status, StoryError>>> = vec![None; cases.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, Ok(outcome))) => outcomes[index] = Some(outcome),
                Ok((index, Err(payload))) => {
                    let story = cases[index].story.path();
                    let message = panic_message(payload.as_ref());
                    tracing::warn!(%story, %message, "case panicked");
                    outcomes[index] = Some(Err(StoryError::Panicked { story, message }));
                }
                Err(err) => tracing::warn!(error = %err, "case task did not complete"),
            }
        }

        outcomes
            .into_iter()
            .zip(cases)
            .map(|(outcome, case)| {
                outcome.unwrap_or_else(|| {
                    Err(StoryError::Panicked {
                        story: case.story.path(),
                        message: "case never finished".to_string(),
                    })
                })
            })
            .collect()
    }
}

/// Forwards bus events to the subscriber set until `stop`, then drains both.
async fn forward(
    mut rx: broadcast::Receiver<Event>,
    set: SubscriberSet,
    stop: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            msg = rx.recv() => match msg {
                Ok(ev) => set.emit(&ev),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "suite event forwarder lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = stop.cancelled() => break,
        }
    }
    while let Ok(ev) = rx.try_recv() {
        set.emit(&ev);
    }
    set.shutdown().await;
}

/// Logs a forwarder that did not exit cleanly; returns true if it did.
fn settle_forwarder(joined: Result<(), JoinError>) -> bool {
    match joined {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "suite event forwarder did not complete");
            false
        }
    }
}

/// Builder for a [`Suite`].
pub struct SuiteBuilder {
    cfg: Config,
    orch: OrchestratorBuilder,
    namer: Arc<dyn Namer>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SuiteBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            orch: OrchestratorBuilder::new(cfg.clone()),
            cfg,
            namer: Arc::new(DefaultNamer),
            subscribers: Vec::new(),
        }
    }

    /// Named actions are looked up here.
    pub fn with_registry(mut self, registry: Arc<ActionRegistry>) -> Self {
        self.orch = self.orch.with_registry(registry);
        self
    }

    /// Isolation marks are registered into and read from here.
    pub fn with_isolation(mut self, isolation: Arc<IsolationRegistry>) -> Self {
        self.orch = self.orch.with_isolation(isolation);
        self
    }

    /// Every callback is invoked through `invoker`.
    pub fn with_invoker(mut self, invoker: Arc<dyn Invoke>) -> Self {
        self.orch = self.orch.with_invoker(invoker);
        self
    }

    /// Events are published on `bus`.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.orch = self.orch.with_bus(bus);
        self
    }

    /// Case names come from `namer`.
    pub fn with_namer(mut self, namer: Arc<dyn Namer>) -> Self {
        self.namer = namer;
        self
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive every event of a run through dedicated workers
    /// with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the suite.
    pub fn build(self) -> Suite {
        Suite {
            orch: self.orch.build(),
            namer: self.namer,
            subscribers: self.subscribers,
            limit: self.cfg.concurrency_limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::actions::Action;
    use crate::callbacks::{CallbackFn, SyncFn};
    use crate::error::CallbackError;
    use crate::subscribers::Recorder;
    use crate::values::{Scope, Value};

    fn ok(name: &'static str) -> crate::CallbackRef {
        SyncFn::arc(name, |_scope: &Scope| Ok(Value::Null))
    }

    fn suite(cfg: Config) -> SuiteBuilder {
        Suite::builder(cfg).with_isolation(Arc::new(IsolationRegistry::new()))
    }

    #[tokio::test]
    async fn verdicts_follow_outcomes() {
        let root = Story::builder("shop")
            .action(Action::new("browse", ok("browse")))
            .check_can(ok("check"))
            .child(Story::builder("pays").can())
            .child(
                Story::builder("card declined")
                    .can()
                    .action(Action::new(
                        "pay",
                        SyncFn::arc("pay", |_scope: &Scope| Err(CallbackError::new("declined"))),
                    )),
            )
            .child(Story::builder("no expectation"))
            .child(
                Story::builder("panics")
                    .can()
                    .action(Action::new(
                        "explode",
                        SyncFn::arc("explode", |_scope: &Scope| -> Result<Value, CallbackError> {
                            panic!("kaboom")
                        }),
                    )),
            )
            .build();

        let report = suite(Config::default()).build().run(&root).await;
        let verdicts: Vec<(&str, Verdict)> = report
            .cases()
            .iter()
            .map(|c| (c.name(), c.verdict()))
            .collect();
        assert_eq!(
            verdicts,
            vec![
                ("can: shop / pays", Verdict::Passed),
                ("can: shop / card declined", Verdict::Failed),
                ("shop / no expectation", Verdict::Incomplete),
                ("can: shop / panics", Verdict::Failed),
            ]
        );
        let panicked = report.case("can: shop / panics").and_then(CaseReport::error);
        assert!(matches!(panicked, Some(StoryError::Panicked { message, .. }) if message == "kaboom"));
        assert_eq!(
            report.summary(),
            Summary {
                passed: 1,
                failed: 2,
                skipped: 0,
                incomplete: 1
            }
        );
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn isolated_subtree_runs_alone() {
        let root = Story::builder("root")
            .can()
            .action(Action::new("a", ok("a")))
            .check_can(ok("check"))
            .child(Story::builder("focus").isolated().child(Story::builder("inner")))
            .child(Story::builder("elsewhere"))
            .build();

        let report = suite(Config::default()).build().run(&root).await;
        let verdicts: Vec<Verdict> = report.cases().iter().map(|c| c.verdict()).collect();
        assert_eq!(verdicts, vec![Verdict::Passed, Verdict::Skipped]);
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn subscribers_see_the_whole_run() {
        let recorder = Recorder::new();
        let root = Story::builder("root")
            .can()
            .action(Action::new("a", ok("a")))
            .check_can(ok("check"))
            .child(Story::builder("one"))
            .child(Story::builder("two"))
            .build();

        let report = suite(Config::default())
            .with_subscribers(vec![Arc::new(recorder.clone())])
            .build()
            .run(&root)
            .await;
        assert!(report.is_success());

        let kinds = recorder.kinds().await;
        assert_eq!(kinds.first(), Some(&EventKind::SuiteStarting));
        assert_eq!(kinds.last(), Some(&EventKind::SuiteFinished));
        assert_eq!(recorder.of_kind(EventKind::StoryPassed).await.len(), 2);

        let finished = recorder.of_kind(EventKind::SuiteFinished).await;
        assert_eq!(
            finished[0].reason.as_deref(),
            Some("passed=2 failed=0 skipped=0 incomplete=0")
        );
    }

    #[tokio::test]
    async fn forwarder_panic_is_reported_not_swallowed() {
        assert!(settle_forwarder(tokio::spawn(async {}).await));
        let crashed = tokio::spawn(async { panic!("forwarder crashed") }).await;
        assert!(!settle_forwarder(crashed));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_is_capped() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (r, p) = (Arc::clone(&running), Arc::clone(&peak));
        let body = CallbackFn::arc("busy", move |_scope: Scope| {
            let (running, peak) = (Arc::clone(&r), Arc::clone(&p));
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, CallbackError>(Value::Null)
            }
        });

        let root = Story::builder("root")
            .can()
            .action(Action::new("busy", body))
            .check_can(ok("check"))
            .children((0..6).map(|i| Story::builder(format!("case {i}"))))
            .build();

        let cfg = Config {
            max_concurrent: 2,
            ..Config::default()
        };
        let report = suite(cfg).build().run(&root).await;

        assert_eq!(report.summary().passed, 6);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
