use std::sync::Arc;

use crate::{
    actions::ActionRegistry,
    callbacks::{DirectInvoker, Invoke},
    config::Config,
    events::Bus,
    isolation::IsolationRegistry,
    resolve::Resolver,
    timeout::TimeoutSupervisor,
};

use super::orchestrator::Orchestrator;

/// Builder for an [`Orchestrator`] with injectable collaborators.
///
/// Anything not set falls back to a default:
/// - registry: a fresh, empty [`ActionRegistry`]
/// - isolation: [`IsolationRegistry::global`]
/// - invoker: [`DirectInvoker`]
/// - bus: a new [`Bus`] sized by [`Config::bus_capacity_clamped`]
pub struct OrchestratorBuilder {
    cfg: Config,
    registry: Option<Arc<ActionRegistry>>,
    isolation: Option<Arc<IsolationRegistry>>,
    invoker: Option<Arc<dyn Invoke>>,
    bus: Option<Bus>,
}

impl OrchestratorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            registry: None,
            isolation: None,
            invoker: None,
            bus: None,
        }
    }

    /// Named actions are looked up here.
    pub fn with_registry(mut self, registry: Arc<ActionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Isolation marks are read from here.
    pub fn with_isolation(mut self, isolation: Arc<IsolationRegistry>) -> Self {
        self.isolation = Some(isolation);
        self
    }

    /// Every callback is invoked through `invoker`.
    pub fn with_invoker(mut self, invoker: Arc<dyn Invoke>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    /// Lifecycle events are published on `bus`.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Builds the orchestrator.
    pub fn build(self) -> Arc<Orchestrator> {
        let bus = self
            .bus
            .unwrap_or_else(|| Bus::new(self.cfg.bus_capacity_clamped()));
        let registry = self.registry.unwrap_or_default();
        let isolation = self.isolation.unwrap_or_else(IsolationRegistry::global);
        let invoker = self
            .invoker
            .unwrap_or_else(|| Arc::new(DirectInvoker) as Arc<dyn Invoke>);

        Arc::new(Orchestrator::new_internal(
            Resolver::new(registry),
            isolation,
            invoker,
            TimeoutSupervisor::from_config(&self.cfg),
            self.cfg.fallback_timeout(),
            bus,
        ))
    }
}
