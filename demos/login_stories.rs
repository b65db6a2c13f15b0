//! # Example: login_stories
//!
//! A small family of login scenarios declared as one story tree.
//!
//! Shows how to:
//! - Register shared actions in an [`ActionRegistry`] and bind them by name.
//! - Let children override data, arguments, expectations and timeouts.
//! - Add assertions per expectation bucket.
//! - Attach [`LogWriter`] and a custom [`Subscribe`] implementation.
//!
//! ## Flow
//! ```text
//! Story tree ──► Suite::run()
//!     ├─► IsolationRegistry::register_tree()
//!     ├─► per leaf: Orchestrator::run()
//!     │     ├─► publish(StoryStarting / PhaseStarting / ActionInvoked / ...)
//!     │     └─► publish(StoryPassed | StorySkipped | StoryFailed)
//!     └─► forwarder ──► SubscriberSet ──► LogWriter, Tally
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=storyvisor=debug cargo run --example login_stories
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;
use storyvisor::{
    Action, ActionBinding, ActionRegistry, CallbackError, CallbackFn, Config, Event, EventKind,
    IsolationRegistry, LogWriter, Scope, Story, Subscribe, Suite, SyncFn,
};
use tracing_subscriber::EnvFilter;

/// Counts invoked actions across the run.
#[derive(Default)]
struct Tally {
    actions: AtomicUsize,
}

#[async_trait::async_trait]
impl Subscribe for Tally {
    async fn on_event(&self, ev: &Event) {
        if ev.kind == EventKind::ActionInvoked {
            self.actions.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn name(&self) -> &'static str {
        "tally"
    }
}

fn registry() -> Arc<ActionRegistry> {
    let registry = ActionRegistry::new();

    registry.register(
        Action::new(
            "open_session",
            SyncFn::arc("open_session", |scope: &Scope| {
                let host: String = scope.get("host")?;
                Ok(json!({ "host": host, "session": 7 }))
            }),
        )
        .with_variable("session")
        .with_order(10),
    );

    registry.register(
        Action::new(
            "login",
            CallbackFn::arc("login", |scope: Scope| async move {
                let latency: u64 = scope.get("latency_ms")?;
                tokio::time::sleep(Duration::from_millis(latency)).await;
                let password: String = scope.get("password")?;
                Ok::<_, CallbackError>(json!(password == "hunter2"))
            }),
        )
        .with_order(20),
    );

    registry.register(Action::new(
        "no_lockout",
        SyncFn::arc("no_lockout", |scope: &Scope| {
            let attempts: u64 = scope.get("attempts").unwrap_or(1);
            if attempts > 3 {
                return Err(CallbackError::new("account locked"));
            }
            Ok(json!(true))
        }),
    ));

    Arc::new(registry)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let accepted = SyncFn::arc("accepted", |scope: &Scope| match scope.result_as::<bool>()? {
        true => Ok(json!(true)),
        false => Err(CallbackError::new("expected the login to succeed")),
    });
    let rejected = SyncFn::arc("rejected", |scope: &Scope| match scope.result_as::<bool>()? {
        false => Ok(json!(true)),
        true => Err(CallbackError::new("expected the login to fail")),
    });

    let root = Story::builder("login")
        .data("host", "auth.local")
        .data("latency_ms", 10)
        .action("open_session")
        .action("login")
        .timeout(Duration::from_millis(200))
        .check_can(accepted)
        .check_cannot(rejected)
        .tag("area", "auth")
        .child(Story::builder("with the right password").can().data("password", "hunter2"))
        .child(
            Story::builder("with a wrong password")
                .cannot()
                .data("password", "letmein")
                .assert_cannot(ActionBinding::new("no_lockout").with_argument("attempts", 1)),
        )
        .child(
            Story::builder("over a slow network")
                .can()
                .data("password", "hunter2")
                .data("latency_ms", 500)
                .tag("slow", true),
        )
        .build();

    let tally = Arc::new(Tally::default());
    let subs: Vec<Arc<dyn Subscribe>> = vec![
        Arc::new(LogWriter) as Arc<dyn Subscribe>,
        tally.clone() as Arc<dyn Subscribe>,
    ];

    let suite = Suite::builder(Config::default())
        .with_registry(registry())
        .with_isolation(Arc::new(IsolationRegistry::new()))
        .with_subscribers(subs)
        .build();

    let report = suite.run(&root).await;
    for case in report.cases() {
        match case.error() {
            Some(err) => println!("{:<10} {}  ({})", case.verdict(), case.name(), err.as_message()),
            None => println!("{:<10} {}", case.verdict(), case.name()),
        }
    }
    println!("{}", report.summary());
    println!("actions invoked: {}", tally.actions.load(Ordering::Relaxed));
    println!("{}", serde_json::to_string_pretty(&report.summary())?);

    Ok(())
}
