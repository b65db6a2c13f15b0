//! # Orchestrator: the story lifecycle state machine.
//!
//! Drives one leaf story through its phases, composing the [`Resolver`],
//! the [`IsolationRegistry`] and the [`TimeoutSupervisor`].
//!
//! ## Phase flow
//! ```text
//! run(leaf)
//!   ├─► Inherit   isolation check ── skip? ─────────────────────────┐
//!   │             resolve lineage (cached)                          │
//!   ├─► Register  on_register hook of each action, in order         │
//!   ├─► Boot      ┌ under TimeoutSupervisor when a limit applies ┐  │
//!   │             │ set_up                                       │  │
//!   │             │ before hooks (outermost first)               │  │
//!   │             │ per action: on_boot, body × repeat           │  │
//!   │             │ after hooks (outermost first)                │  │
//!   │             └──────────────────────────────────────────────┘  │
//!   ├─► Assert    always bucket, expected bucket, then checker      │
//!   └─► Teardown  tear_down hook ◄──────────── always ──────────────┘
//! ```
//!
//! ## Events
//! ```text
//! StoryStarting → PhaseStarting(inherit) → ... → StoryPassed
//!                                              → StorySkipped (isolation)
//!                                              → TimeoutHit → ... → StoryFailed
//!                                              → StoryFailed
//! ```
//!
//! ## Rules
//! - A leaf runs at most once; later (or concurrent) `run` calls return the
//!   recorded outcome
//! - The first failing phase stops the remaining ones, except teardown
//! - A teardown failure is reported together with the earlier failure
//! - A parent never runs phases itself; it runs its leaves depth-first

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::{
    actions::ActionRegistry,
    callbacks::{CallbackRef, Invoke},
    config::Config,
    error::{StoryError, TimedOut},
    events::{Bus, Event, EventKind},
    isolation::IsolationRegistry,
    resolve::{EffectiveConfig, Resolver},
    story::{Hook, Story, Toggle},
    timeout::TimeoutSupervisor,
    values::{Value, Values},
};

use super::builder::OrchestratorBuilder;
use super::phase::{Phase, Status};

/// Runs stories through their lifecycle.
pub struct Orchestrator {
    resolver: Resolver,
    isolation: Arc<IsolationRegistry>,
    invoker: Arc<dyn Invoke>,
    timeouts: TimeoutSupervisor,
    fallback_timeout: Option<Duration>,
    bus: Bus,
}

impl Orchestrator {
    /// Creates a builder.
    pub fn builder(cfg: Config) -> OrchestratorBuilder {
        OrchestratorBuilder::new(cfg)
    }

    /// Creates an orchestrator with default collaborators.
    pub fn new(cfg: Config) -> Arc<Self> {
        Self::builder(cfg).build()
    }

    pub(crate) fn new_internal(
        resolver: Resolver,
        isolation: Arc<IsolationRegistry>,
        invoker: Arc<dyn Invoke>,
        timeouts: TimeoutSupervisor,
        fallback_timeout: Option<Duration>,
        bus: Bus,
    ) -> Self {
        Self {
            resolver,
            isolation,
            invoker,
            timeouts,
            fallback_timeout,
            bus,
        }
    }

    /// Bus lifecycle events are published on.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Registry named actions are looked up in.
    pub fn registry(&self) -> &Arc<ActionRegistry> {
        self.resolver.registry()
    }

    /// Isolation registry consulted at the inherit phase.
    pub fn isolation(&self) -> &Arc<IsolationRegistry> {
        &self.isolation
    }

    /// Resolver used for effective configurations.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Timeout applied to the boot phase of a story with this configuration.
    ///
    /// An explicit setting in the lineage wins; the configured default only
    /// fills in when nothing was said.
    pub fn effective_timeout(&self, effective: &EffectiveConfig) -> Option<Duration> {
        match effective.timeout_setting() {
            Toggle::Enabled(limit) => Some(limit),
            Toggle::Disabled => None,
            Toggle::Unset => self.fallback_timeout,
        }
    }

    /// Runs `story`.
    ///
    /// Isolation marks declared anywhere in the story's tree are registered
    /// first, so the skip decision is the same however the tree is entered.
    /// A leaf goes through its phases. A parent runs all of its leaves,
    /// depth-first, and returns the first error, otherwise `Passed` if any
    /// leaf passed, else `Skipped`.
    pub async fn run(&self, story: &Arc<Story>) -> Result<Status, StoryError> {
        let root = story.ancestors().pop().unwrap_or_else(|| Arc::clone(story));
        self.isolation.register_tree(&root);

        if story.is_leaf() {
            return self.run_leaf(story).await;
        }

        let mut first_err = None;
        let mut passed = false;
        for leaf in story.leaves() {
            match self.run_leaf(&leaf).await {
                Ok(Status::Passed) => passed = true,
                Ok(Status::Skipped) => {}
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None if passed => Ok(Status::Passed),
            None => Ok(Status::Skipped),
        }
    }

    async fn run_leaf(&self, story: &Story) -> Result<Status, StoryError> {
        story
            .outcome_cell()
            .get_or_init(|| self.execute(story))
            .await
            .clone()
    }

    async fn execute(&self, story: &Story) -> Result<Status, StoryError> {
        let run = StoryRun {
            orch: self,
            story,
            path: story.path().into(),
            cancel: CancellationToken::new(),
        };
        run.publish(run.event(EventKind::StoryStarting));

        let result = run.phases().await;
        if let Err(e) = &result {
            story.record_error(e.clone());
        }

        let outcome = match run.teardown().await {
            Ok(()) => result,
            Err(error) => {
                let err = StoryError::Teardown {
                    story: run.path.to_string(),
                    error: Box::new(error),
                    prior: result.err().map(Box::new),
                };
                story.record_error(err.clone());
                Err(err)
            }
        };

        run.finish(&outcome);
        outcome
    }
}

/// State of one leaf execution.
struct StoryRun<'a> {
    orch: &'a Orchestrator,
    story: &'a Story,
    path: Arc<str>,
    cancel: CancellationToken,
}

impl StoryRun<'_> {
    async fn phases(&self) -> Result<Status, StoryError> {
        self.enter(Phase::Inherit);
        let skip = self.orch.isolation.should_skip(self.story);
        self.story.set_skipped(skip);
        if skip {
            return Ok(Status::Skipped);
        }
        let effective = self.orch.resolver.resolve(self.story)?;

        self.enter(Phase::Register);
        for resolved in effective.actions() {
            if let Some(hook) = resolved.action().register_hook() {
                self.call(
                    Phase::Register,
                    hook,
                    &effective,
                    Some(resolved.arguments()),
                    &self.cancel,
                )
                .await?;
            }
        }

        self.enter(Phase::Boot);
        if effective.actions().is_empty() {
            return Err(StoryError::NoRunnableAction {
                story: self.path.to_string(),
            });
        }
        self.boot_supervised(&effective).await?;

        self.enter(Phase::Assert);
        self.assert(&effective).await
    }

    async fn boot_supervised(&self, effective: &EffectiveConfig) -> Result<(), StoryError> {
        let token = self.cancel.child_token();
        let Some(limit) = self.orch.effective_timeout(effective) else {
            return self.boot(effective, &token).await;
        };

        match self
            .orch
            .timeouts
            .run(limit, &token, self.boot(effective, &token))
            .await
        {
            Ok(result) => result,
            Err(TimedOut {
                configured,
                elapsed,
            }) => {
                tracing::warn!(story = %self.path, ?configured, ?elapsed, "boot phase timed out");
                self.publish(
                    self.event(EventKind::TimeoutHit)
                        .with_phase(Phase::Boot)
                        .with_timeout(configured)
                        .with_elapsed(elapsed),
                );
                Err(StoryError::Timeout {
                    story: self.path.to_string(),
                    configured,
                    elapsed,
                })
            }
        }
    }

    async fn boot(
        &self,
        effective: &EffectiveConfig,
        cancel: &CancellationToken,
    ) -> Result<(), StoryError> {
        let hooks = effective.hooks();
        if let Some(set_up) = hooks.get(Hook::SetUp) {
            self.call(Phase::Boot, set_up, effective, None, cancel)
                .await?;
        }
        for before in hooks.before() {
            self.call(Phase::Boot, before, effective, None, cancel)
                .await?;
        }

        for resolved in effective.actions() {
            let action = resolved.action();
            let arguments = Some(resolved.arguments());
            if let Some(hook) = action.boot_hook() {
                self.call(Phase::Boot, hook, effective, arguments, cancel)
                    .await?;
            }
            for repetition in 1..=action.repeat() {
                self.publish(
                    self.event(EventKind::ActionInvoked)
                        .with_phase(Phase::Boot)
                        .with_action(action.name())
                        .with_repetition(repetition),
                );
                let value = self
                    .call(Phase::Boot, action.body(), effective, arguments, cancel)
                    .await?;
                self.story.record_value(action.variable(), value);
            }
        }

        for after in hooks.after() {
            self.call(Phase::Boot, after, effective, None, cancel)
                .await?;
        }
        Ok(())
    }

    async fn assert(&self, effective: &EffectiveConfig) -> Result<Status, StoryError> {
        let expectation =
            effective
                .expectation()
                .ok_or_else(|| StoryError::ExpectationNotSpecified {
                    story: self.path.to_string(),
                })?;

        let assertions = self.orch.resolver.assertions(self.story, expectation)?;
        for resolved in &assertions {
            self.publish(
                self.event(EventKind::ActionInvoked)
                    .with_phase(Phase::Assert)
                    .with_action(resolved.action().name())
                    .with_repetition(1),
            );
            self.call(
                Phase::Assert,
                resolved.action().body(),
                effective,
                Some(resolved.arguments()),
                &self.cancel,
            )
            .await?;
        }

        match effective.hooks().checker(expectation) {
            Some(checker) => {
                self.call(Phase::Assert, checker, effective, None, &self.cancel)
                    .await?;
            }
            None if assertions.is_empty() => {
                return Err(StoryError::CheckerNotSpecified {
                    story: self.path.to_string(),
                    expectation: expectation.as_label(),
                });
            }
            None => {}
        }
        Ok(Status::Passed)
    }

    async fn teardown(&self) -> Result<(), StoryError> {
        self.enter(Phase::Teardown);
        let effective = match self.story.effective() {
            Some(effective) => effective,
            None => Arc::new(self.orch.resolver.resolve_partial(self.story)),
        };
        match effective.hooks().get(Hook::TearDown) {
            Some(hook) => self
                .call(Phase::Teardown, hook, &effective, None, &self.cancel)
                .await
                .map(drop),
            None => Ok(()),
        }
    }

    async fn call(
        &self,
        phase: Phase,
        callback: &CallbackRef,
        effective: &EffectiveConfig,
        arguments: Option<&Values>,
        cancel: &CancellationToken,
    ) -> Result<Value, StoryError> {
        let scope = self.story.scope(effective.data(), arguments, cancel);
        self.orch
            .invoker
            .invoke(callback, scope)
            .await
            .map_err(|source| StoryError::Callback {
                story: self.path.to_string(),
                phase,
                callback: callback.name().to_string(),
                source,
            })
    }

    fn enter(&self, phase: Phase) {
        self.story.mark(phase);
        tracing::trace!(story = %self.path, %phase, "entering phase");
        self.publish(self.event(EventKind::PhaseStarting).with_phase(phase));
    }

    fn finish(&self, outcome: &Result<Status, StoryError>) {
        let ev = match outcome {
            Ok(Status::Passed) => self.event(EventKind::StoryPassed),
            Ok(Status::Skipped) => self.event(EventKind::StorySkipped),
            Err(e) => {
                tracing::debug!(story = %self.path, label = e.as_label(), "story failed");
                let ev = self
                    .event(EventKind::StoryFailed)
                    .with_reason(e.as_message());
                match e.phase() {
                    Some(phase) => ev.with_phase(phase),
                    None => ev,
                }
            }
        };
        self.publish(ev);
    }

    fn event(&self, kind: EventKind) -> Event {
        Event::new(kind).with_story(Arc::clone(&self.path))
    }

    fn publish(&self, ev: Event) {
        self.orch.bus.publish(ev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use serde_json::json;
    use tokio::time;

    use crate::actions::{Action, ActionBinding};
    use crate::callbacks::{CallbackFn, SyncFn};
    use crate::error::CallbackError;
    use crate::values::Scope;

    /// Shared log of callback invocations.
    #[derive(Clone, Default)]
    struct Trace(Arc<Mutex<Vec<String>>>);

    impl Trace {
        fn cb(&self, label: &'static str) -> CallbackRef {
            let log = self.clone();
            SyncFn::arc(label, move |_scope: &Scope| {
                log.push(label);
                Ok(Value::Null)
            })
        }

        fn failing(&self, label: &'static str) -> CallbackRef {
            let log = self.clone();
            SyncFn::arc(label, move |_scope: &Scope| {
                log.push(label);
                Err(CallbackError::new(format!("{label} broke")))
            })
        }

        fn push(&self, label: &str) {
            self.0.lock().unwrap().push(label.to_string());
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }

        fn count(&self, label: &str) -> usize {
            self.entries().iter().filter(|e| *e == label).count()
        }
    }

    fn orchestrator(registry: ActionRegistry) -> Arc<Orchestrator> {
        Orchestrator::builder(Config::default())
            .with_registry(Arc::new(registry))
            .with_isolation(Arc::new(IsolationRegistry::new()))
            .build()
    }

    fn slow(label: &'static str, secs: u64) -> CallbackRef {
        CallbackFn::arc(label, move |_scope: Scope| async move {
            time::sleep(Duration::from_secs(secs)).await;
            Ok::<_, CallbackError>(json!(label))
        })
    }

    #[tokio::test]
    async fn phases_run_in_lifecycle_order() {
        let t = Trace::default();
        let action = Action::new("act", t.cb("body"))
            .on_register(t.cb("on_register"))
            .on_boot(t.cb("on_boot"));

        let root = Story::builder("root")
            .set_up(t.cb("set_up"))
            .before(t.cb("before-root"))
            .after(t.cb("after-root"))
            .tear_down(t.cb("tear_down"))
            .check_can(t.cb("check"))
            .assert_always(Action::new("always", t.cb("assert-always")))
            .child(
                Story::builder("leaf")
                    .can()
                    .action(action)
                    .before(t.cb("before-leaf"))
                    .after(t.cb("after-leaf")),
            )
            .build();
        let leaf = Arc::clone(&root.children()[0]);

        let status = orchestrator(ActionRegistry::new()).run(&leaf).await;
        assert_eq!(status.expect("passes"), Status::Passed);
        assert_eq!(
            t.entries(),
            vec![
                "on_register",
                "set_up",
                "before-root",
                "before-leaf",
                "on_boot",
                "body",
                "after-root",
                "after-leaf",
                "assert-always",
                "check",
                "tear_down",
            ]
        );
        for phase in Phase::ALL {
            assert!(leaf.has_run(phase), "{phase} did not run");
        }
    }

    #[tokio::test]
    async fn repeat_runs_body_n_times_and_keeps_last_value() {
        let counter = Arc::new(std::sync::atomic::AtomicU64::new(0));
        let c = Arc::clone(&counter);
        let tick = Action::new(
            "tick",
            SyncFn::arc("tick", move |_scope: &Scope| {
                Ok(json!(c.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1))
            }),
        )
        .with_repeat(3)
        .with_variable("ticks");

        let story = Story::builder("count")
            .action(tick)
            .can()
            .check_can(SyncFn::arc("check", |scope: &Scope| {
                let last: u64 = scope.result_as()?;
                if last == 3 {
                    Ok(Value::Null)
                } else {
                    Err(CallbackError::new(format!("last tick was {last}")))
                }
            }))
            .build();

        let orch = orchestrator(ActionRegistry::new());
        assert_eq!(orch.run(&story).await, Ok(Status::Passed));
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 3);
        assert_eq!(story.variables()["ticks"], json!(3));
        assert!(story.result().has_value());
    }

    #[tokio::test(start_paused = true)]
    async fn inherited_timeout_interrupts_and_override_extends() {
        let t = Trace::default();
        let root = Story::builder("root")
            .timeout(Duration::from_secs(1))
            .action(Action::new("wait", slow("wait", 2)))
            .can()
            .check_can(t.cb("check"))
            .tear_down(t.cb("tear_down"))
            .child(Story::builder("patient").timeout(Duration::from_secs(3)))
            .child(Story::builder("hasty"))
            .build();
        let patient = Arc::clone(&root.children()[0]);
        let hasty = Arc::clone(&root.children()[1]);
        let orch = orchestrator(ActionRegistry::new());

        assert_eq!(orch.run(&patient).await, Ok(Status::Passed));

        let err = orch.run(&hasty).await.expect_err("must time out");
        let timed_out = err.as_timeout().expect("timeout error");
        assert_eq!(timed_out.configured, Duration::from_secs(1));
        assert!(timed_out.elapsed >= Duration::from_secs(1));
        assert_eq!(hasty.result().error().map(|e| e.as_label()), Some("story_timeout"));

        assert_eq!(t.count("check"), 1);
        assert_eq!(t.count("tear_down"), 2);
        assert!(hasty.has_run(Phase::Teardown));
        assert!(!hasty.has_run(Phase::Assert));
    }

    #[tokio::test(start_paused = true)]
    async fn default_timeout_fills_in_only_when_unset() {
        let cfg = Config {
            default_timeout: Duration::from_millis(500),
            ..Config::default()
        };
        let orch = Orchestrator::builder(cfg)
            .with_isolation(Arc::new(IsolationRegistry::new()))
            .build();

        let root = Story::builder("root")
            .action(Action::new("wait", slow("wait", 1)))
            .can()
            .check_can(SyncFn::arc("ok", |_scope: &Scope| Ok(Value::Null)))
            .child(Story::builder("unset"))
            .child(Story::builder("disabled").no_timeout())
            .build();

        let unset = orch.run(&root.children()[0]).await;
        assert_eq!(unset.expect_err("falls back").as_label(), "story_timeout");
        assert_eq!(orch.run(&root.children()[1]).await, Ok(Status::Passed));
    }

    #[tokio::test]
    async fn assertions_run_always_then_expected_bucket_never_the_other() {
        let t = Trace::default();
        let root = Story::builder("parent")
            .assert_can(Action::new("a", t.cb("A")))
            .assert_always(Action::new("b", t.cb("B")))
            .assert_cannot(Action::new("c", t.cb("C")))
            .action(Action::new("noop", t.cb("body")))
            .child(Story::builder("child").can())
            .build();

        let orch = orchestrator(ActionRegistry::new());
        assert_eq!(orch.run(&root.children()[0]).await, Ok(Status::Passed));

        let asserted: Vec<String> = t
            .entries()
            .into_iter()
            .filter(|e| e != "body")
            .collect();
        assert_eq!(asserted, vec!["B", "A"]);
    }

    #[tokio::test]
    async fn configuration_errors_still_tear_down() {
        let t = Trace::default();
        let root = Story::builder("root")
            .tear_down(t.cb("tear_down"))
            .child(Story::builder("no actions").can().check_can(t.cb("check")))
            .child(Story::builder("no expectation").action(Action::new("x", t.cb("x"))))
            .child(Story::builder("no checker").can().action(Action::new("y", t.cb("y"))))
            .build();
        let orch = orchestrator(ActionRegistry::new());

        let labels: Vec<&'static str> = {
            let mut out = Vec::new();
            for child in root.children() {
                let err = orch.run(child).await.expect_err("misconfigured");
                assert!(err.is_configuration(), "{err}");
                out.push(err.as_label());
            }
            out
        };
        assert_eq!(
            labels,
            vec![
                "story_no_runnable_action",
                "story_expectation_not_specified",
                "story_checker_not_specified",
            ]
        );
        assert_eq!(t.count("tear_down"), 3);
        assert_eq!(t.count("check"), 0);
    }

    #[tokio::test]
    async fn teardown_failure_keeps_prior_error() {
        let t = Trace::default();
        let story = Story::builder("s")
            .can()
            .action(Action::new("boom", t.failing("boom")))
            .tear_down(t.failing("cleanup"))
            .build();

        let err = orchestrator(ActionRegistry::new())
            .run(&story)
            .await
            .expect_err("fails twice");
        match &err {
            StoryError::Teardown { error, prior, .. } => {
                assert_eq!(error.phase(), Some(Phase::Teardown));
                let prior = prior.as_deref().expect("prior error kept");
                assert_eq!(prior.phase(), Some(Phase::Boot));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(story.result().error().map(|e| e.as_label()), Some("story_teardown_failed"));
    }

    #[tokio::test]
    async fn rerun_returns_recorded_outcome_without_running_again() {
        let t = Trace::default();
        let story = Story::builder("once")
            .can()
            .action(Action::new("act", t.cb("body")))
            .check_can(t.cb("check"))
            .build();
        let orch = orchestrator(ActionRegistry::new());

        let first = orch.run(&story).await;
        let second = orch.run(&story).await;
        assert_eq!(first, second);
        assert_eq!(t.count("body"), 1);
        assert_eq!(t.count("check"), 1);
        assert_eq!(story.outcome(), Some(Ok(Status::Passed)));
    }

    #[tokio::test]
    async fn isolated_out_story_is_skipped_but_torn_down() {
        let t = Trace::default();
        let root = Story::builder("root")
            .can()
            .action(Action::new("act", t.cb("body")))
            .check_can(t.cb("check"))
            .tear_down(t.cb("tear_down"))
            .child(Story::builder("focused"))
            .child(Story::builder("other"))
            .build();
        let isolation = Arc::new(IsolationRegistry::new());
        isolation.mark_isolated(&root.children()[0]);
        let orch = Orchestrator::builder(Config::default())
            .with_isolation(isolation)
            .build();

        assert_eq!(orch.run(&root.children()[1]).await, Ok(Status::Skipped));
        assert!(root.children()[1].is_skipped());
        assert_eq!(t.count("body"), 0);
        assert_eq!(t.count("tear_down"), 1);

        assert_eq!(orch.run(&root.children()[0]).await, Ok(Status::Passed));
        assert_eq!(t.count("body"), 1);
    }

    #[tokio::test]
    async fn declared_isolation_applies_without_a_suite() {
        let t = Trace::default();
        let root = Story::builder("root")
            .can()
            .action(Action::new("act", t.cb("body")))
            .check_can(t.cb("check"))
            .tear_down(t.cb("tear_down"))
            .child(Story::builder("focused").isolated())
            .child(Story::builder("other"))
            .build();
        let orch = orchestrator(ActionRegistry::new());

        assert_eq!(orch.run(&root).await, Ok(Status::Passed));
        assert_eq!(t.count("body"), 1);
        assert_eq!(t.count("tear_down"), 2);
        assert!(!root.children()[0].is_skipped());
        assert!(root.children()[1].is_skipped());
        assert!(orch.isolation().is_marked(&root.children()[0]));
    }

    #[tokio::test]
    async fn entering_at_a_leaf_still_sees_sibling_marks() {
        let t = Trace::default();
        let root = Story::builder("root")
            .can()
            .action(Action::new("act", t.cb("body")))
            .check_can(t.cb("check"))
            .child(Story::builder("focused").isolated())
            .child(Story::builder("other"))
            .build();
        let orch = orchestrator(ActionRegistry::new());

        assert_eq!(orch.run(&root.children()[1]).await, Ok(Status::Skipped));
        assert_eq!(t.count("body"), 0);
    }

    #[tokio::test]
    async fn repeat_zero_never_runs_the_body() {
        let t = Trace::default();
        let story = Story::builder("idle")
            .can()
            .action(Action::new("tick", t.cb("tick")).with_repeat(0))
            .check_can(t.cb("check"))
            .build();

        assert_eq!(orchestrator(ActionRegistry::new()).run(&story).await, Ok(Status::Passed));
        assert_eq!(t.count("tick"), 0);
        assert_eq!(t.count("check"), 1);
        assert!(!story.result().has_value());
    }

    #[tokio::test]
    async fn repeat_defaults_to_one() {
        let t = Trace::default();
        let story = Story::builder("once")
            .can()
            .action(Action::new("tick", t.cb("tick")))
            .check_can(t.cb("check"))
            .build();

        assert_eq!(orchestrator(ActionRegistry::new()).run(&story).await, Ok(Status::Passed));
        assert_eq!(t.count("tick"), 1);
        assert!(story.result().has_value());
    }

    #[tokio::test]
    async fn assert_failure_still_tears_down_once() {
        let t = Trace::default();
        let story = Story::builder("bad check")
            .can()
            .action(Action::new("act", t.cb("body")))
            .assert_always(Action::new("always", t.cb("assert-always")))
            .check_can(t.failing("check"))
            .tear_down(t.cb("tear_down"))
            .build();

        let err = orchestrator(ActionRegistry::new())
            .run(&story)
            .await
            .expect_err("checker fails");
        assert!(matches!(
            &err,
            StoryError::Callback { phase: Phase::Assert, callback, .. } if callback == "check"
        ));
        assert_eq!(t.count("tear_down"), 1);
        assert_eq!(t.entries().last().map(String::as_str), Some("tear_down"));

        let recorded = story.result().error().cloned();
        assert_eq!(recorded.as_ref().and_then(StoryError::phase), Some(Phase::Assert));
        assert_eq!(recorded, Some(err));
    }

    #[tokio::test]
    async fn failing_assertion_binding_stops_before_the_checker() {
        let t = Trace::default();
        let story = Story::builder("bad assertion")
            .can()
            .action(Action::new("act", t.cb("body")))
            .assert_can(Action::new("reachable", t.failing("reachable")))
            .check_can(t.cb("check"))
            .tear_down(t.cb("tear_down"))
            .build();

        let err = orchestrator(ActionRegistry::new())
            .run(&story)
            .await
            .expect_err("assertion fails");
        assert_eq!(err.phase(), Some(Phase::Assert));
        assert_eq!(t.count("check"), 0);
        assert_eq!(t.count("tear_down"), 1);
    }

    #[tokio::test]
    async fn cannot_story_uses_only_the_cannot_checker() {
        let t = Trace::default();
        let log = t.clone();
        let saw = Arc::new(Mutex::new(None));
        let seen = Arc::clone(&saw);
        let rejected = SyncFn::arc("rejected", move |scope: &Scope| {
            log.push("check_cannot");
            *seen.lock().unwrap() = scope.result().cloned();
            Ok(Value::Null)
        });

        let root = Story::builder("login")
            .action(Action::new(
                "login",
                SyncFn::arc("login", |_scope: &Scope| Ok(json!("denied"))),
            ))
            .check_can(t.cb("check_can"))
            .check_cannot(rejected)
            .child(Story::builder("with a wrong password").cannot())
            .build();
        let leaf = Arc::clone(&root.children()[0]);

        assert_eq!(orchestrator(ActionRegistry::new()).run(&leaf).await, Ok(Status::Passed));
        assert_eq!(t.count("check_cannot"), 1);
        assert_eq!(t.count("check_can"), 0);
        assert_eq!(*saw.lock().unwrap(), Some(json!("denied")));
    }

    #[tokio::test]
    async fn parent_runs_every_leaf_and_reports_first_error() {
        let t = Trace::default();
        let root = Story::builder("root")
            .can()
            .check_can(t.cb("check"))
            .child(Story::builder("ok").action(Action::new("a", t.cb("a"))))
            .child(Story::builder("bad").action(Action::new("b", t.failing("b"))))
            .child(Story::builder("worse").action(Action::new("c", t.failing("c"))))
            .build();

        let err = orchestrator(ActionRegistry::new())
            .run(&root)
            .await
            .expect_err("a leaf failed");
        assert_eq!(err.story(), "root / bad");
        assert_eq!(t.entries(), vec!["a", "check", "b", "c"]);
    }

    #[tokio::test]
    async fn named_actions_see_data_arguments_and_earlier_variables() {
        let registry = ActionRegistry::new();
        registry.register(
            Action::new(
                "login",
                SyncFn::arc("login", |scope: &Scope| {
                    let user: String = scope.get("user")?;
                    let password: String = scope.get("password")?;
                    Ok(json!({ "user": user, "ok": password == "secret" }))
                }),
            )
            .with_variable("session")
            .with_order(10),
        );
        registry.register(
            Action::new(
                "whoami",
                SyncFn::arc("whoami", |scope: &Scope| {
                    let session: Value = scope.get("session")?;
                    Ok(session["user"].clone())
                }),
            )
            .with_order(20),
        );

        let root = Story::builder("login")
            .data("user", "alice")
            .data("password", "wrong")
            .action("login")
            .action("whoami")
            .child(
                Story::builder("with the right password")
                    .can()
                    .action(ActionBinding::new("login").with_argument("password", "secret"))
                    .check_can(SyncFn::arc("is alice", |scope: &Scope| {
                        match scope.result_as::<String>()?.as_str() {
                            "alice" => Ok(Value::Null),
                            other => Err(CallbackError::new(format!("got {other}"))),
                        }
                    })),
            )
            .build();
        let leaf = Arc::clone(&root.children()[0]);

        assert_eq!(orchestrator(registry).run(&leaf).await, Ok(Status::Passed));
        assert_eq!(leaf.variables()["session"]["ok"], json!(true));
    }

    #[tokio::test]
    async fn lifecycle_events_are_published() {
        let orch = orchestrator(ActionRegistry::new());
        let mut rx = orch.bus().subscribe();
        let story = Story::builder("evented")
            .can()
            .action(Action::new("a", SyncFn::arc("a", |_scope: &Scope| Ok(Value::Null))).with_repeat(2))
            .check_can(SyncFn::arc("ok", |_scope: &Scope| Ok(Value::Null)))
            .build();

        orch.run(&story).await.expect("passes");

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            assert_eq!(ev.story.as_deref(), Some("evented"));
            kinds.push(ev.kind);
        }
        assert_eq!(kinds.first(), Some(&EventKind::StoryStarting));
        assert_eq!(kinds.last(), Some(&EventKind::StoryPassed));
        assert_eq!(
            kinds.iter().filter(|k| **k == EventKind::PhaseStarting).count(),
            5
        );
        assert_eq!(
            kinds.iter().filter(|k| **k == EventKind::ActionInvoked).count(),
            2
        );
    }
}
