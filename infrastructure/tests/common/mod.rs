//! Shared wiring for the swarm integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use swarm_application::{
    BackgroundIntervals, ConsensusParams, OrchestrationParams, SwarmConfig, SwarmCoordinator,
};
use swarm_domain::{AgentRecord, AgentRole};
use swarm_infrastructure::{
    AgentBehavior, HeuristicAnalysis, InMemorySwarmStore, InProcessEventBus, SimulatedAgent,
    SimulatedAgentPool,
};
use tokio::task::JoinHandle;

pub const SWARM: &str = "swarm-1";

pub struct Harness {
    pub store: Arc<InMemorySwarmStore>,
    pub bus: Arc<InProcessEventBus>,
    pub coordinator: SwarmCoordinator,
    pool: SimulatedAgentPool,
    pool_handle: Option<JoinHandle<()>>,
}

pub fn fast_orchestration() -> OrchestrationParams {
    OrchestrationParams::default()
        .with_assignment_timeout(Duration::from_secs(2))
        .with_completion_poll_interval(Duration::from_millis(10))
        .with_analysis_timeout(Duration::from_millis(500))
}

/// Background loops slow enough to stay out of the way of a test.
pub fn quiet_intervals() -> BackgroundIntervals {
    BackgroundIntervals::uniform(Duration::from_secs(60))
}

/// Quiet loops except a task distributor that places queued work quickly.
pub fn distributing_intervals() -> BackgroundIntervals {
    BackgroundIntervals {
        task_distributor: Duration::from_millis(20),
        ..quiet_intervals()
    }
}

impl Harness {
    pub fn new(orchestration: OrchestrationParams, consensus: ConsensusParams) -> Self {
        Self::with_intervals(orchestration, consensus, quiet_intervals())
    }

    pub fn with_intervals(
        orchestration: OrchestrationParams,
        consensus: ConsensusParams,
        intervals: BackgroundIntervals,
    ) -> Self {
        let store = Arc::new(InMemorySwarmStore::new());
        let bus = Arc::new(InProcessEventBus::new());
        let config = SwarmConfig::new(orchestration, consensus, intervals);
        let coordinator = SwarmCoordinator::new(
            store.clone(),
            bus.clone(),
            Arc::new(HeuristicAnalysis::new()),
            config,
        );
        let pool = SimulatedAgentPool::new(store.clone(), bus.clone());
        Self {
            store,
            bus,
            coordinator,
            pool,
            pool_handle: None,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(fast_orchestration(), ConsensusParams::default())
    }

    /// Register a simulated agent holding every role capability.
    pub async fn generalist(&mut self, id: &str, behavior: AgentBehavior) {
        let record = AgentRecord::new(id, SWARM, "generalist")
            .with_capabilities(AgentRole::all_capabilities());
        self.agent(SimulatedAgent::new(record).with_behavior(behavior))
            .await;
    }

    pub async fn agent(&mut self, agent: SimulatedAgent) {
        self.register(agent.with_delay(Duration::from_millis(20)))
            .await;
    }

    /// Register an agent keeping its own delay.
    pub async fn register(&mut self, agent: SimulatedAgent) {
        self.pool
            .register(agent)
            .await
            .expect("register simulated agent");
    }

    /// Start answering assignments. Call after every agent is registered.
    pub fn start_agents(&mut self) {
        self.pool_handle = Some(self.pool.start());
    }

    pub async fn shutdown(mut self) {
        self.coordinator.shutdown().await;
        self.pool.stop();
        if let Some(handle) = self.pool_handle.take() {
            let _ = handle.await;
        }
    }
}

impl Harness {
    pub fn bus_events(&self, topics: &[swarm_domain::Topic]) -> swarm_application::Subscription {
        use swarm_application::MessageBus;
        self.bus.subscribe(topics)
    }
}
