//! Simulated agent pool
//!
//! Each simulated agent watches the bus for `taskAssigned` and
//! `agentReassigned` events addressed to it, waits for its configured
//! delay, then reports back through [`SwarmStore::finish_agent`] the same
//! way an external agent would.

use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use swarm_application::{MessageBus, StoreError, SwarmStore};
use swarm_domain::{AgentId, AgentRecord, AgentResult, SwarmEvent, TaskId, Topic};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How a simulated agent answers an assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentBehavior {
    /// Report a successful result
    Succeed,
    /// Report a failed result
    Fail,
    /// Never answer
    Hang,
}

impl AgentBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentBehavior::Succeed => "succeed",
            AgentBehavior::Fail => "fail",
            AgentBehavior::Hang => "hang",
        }
    }
}

/// Agent record plus the behaviour it simulates
#[derive(Debug, Clone)]
pub struct SimulatedAgent {
    pub record: AgentRecord,
    pub behavior: AgentBehavior,
    pub delay: Duration,
}

impl SimulatedAgent {
    pub fn new(record: AgentRecord) -> Self {
        Self {
            record,
            behavior: AgentBehavior::Succeed,
            delay: Duration::from_millis(50),
        }
    }

    pub fn with_behavior(mut self, behavior: AgentBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct Profile {
    behavior: AgentBehavior,
    delay: Duration,
}

/// Pool of simulated agents sharing one bus subscription
pub struct SimulatedAgentPool {
    store: Arc<dyn SwarmStore>,
    bus: Arc<dyn MessageBus>,
    profiles: HashMap<AgentId, Profile>,
    token: CancellationToken,
}

impl SimulatedAgentPool {
    pub fn new(store: Arc<dyn SwarmStore>, bus: Arc<dyn MessageBus>) -> Self {
        Self {
            store,
            bus,
            profiles: HashMap::new(),
            token: CancellationToken::new(),
        }
    }

    /// Persist the agent's record and remember its behaviour.
    pub async fn register(&mut self, agent: SimulatedAgent) -> Result<(), StoreError> {
        self.store.save_agent(&agent.record).await?;
        debug!(
            agent_id = %agent.record.id,
            behavior = agent.behavior.as_str(),
            delay_ms = agent.delay.as_millis() as u64,
            "Simulated agent registered"
        );
        self.profiles.insert(
            agent.record.id.clone(),
            Profile {
                behavior: agent.behavior,
                delay: agent.delay,
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Token that stops the pool and any work in flight
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Subscribe to the bus and start answering assignments.
    ///
    /// The subscription is taken before this returns, so events published
    /// afterwards are never missed.
    pub fn start(&self) -> JoinHandle<()> {
        let mut subscription = self
            .bus
            .subscribe(&[Topic::TaskAssigned, Topic::AgentReassigned]);
        let store = Arc::clone(&self.store);
        let profiles = self.profiles.clone();
        let token = self.token.clone();
        info!(agents = profiles.len(), "Simulated agent pool started");

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    event = subscription.recv() => event,
                };
                let Some(event) = event else {
                    break;
                };
                let Some((agent_id, task_id)) = addressed(&event) else {
                    continue;
                };
                let Some(profile) = profiles.get(&agent_id).copied() else {
                    continue;
                };
                tokio::spawn(work(
                    Arc::clone(&store),
                    agent_id,
                    task_id,
                    event,
                    profile,
                    token.child_token(),
                ));
            }
            debug!("Simulated agent pool stopped");
        })
    }

    pub fn stop(&self) {
        self.token.cancel();
    }
}

/// Agent and task an event hands work to
fn addressed(event: &SwarmEvent) -> Option<(AgentId, TaskId)> {
    Some((event.agent_id.clone()?, event.task_id.clone()?))
}

async fn work(
    store: Arc<dyn SwarmStore>,
    agent_id: AgentId,
    task_id: TaskId,
    event: SwarmEvent,
    profile: Profile,
    cancel: CancellationToken,
) {
    if profile.behavior == AgentBehavior::Hang {
        debug!(agent_id = %agent_id, task_id = %task_id, "Simulated agent ignoring assignment");
        return;
    }

    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::time::sleep(profile.delay) => {}
    }

    let phase = event
        .payload
        .get("phase")
        .and_then(|v| v.as_str())
        .unwrap_or("reassigned")
        .to_string();
    let dispatch = event
        .payload
        .get("dispatch")
        .and_then(|v| v.as_u64())
        .unwrap_or(0);
    let result = match profile.behavior {
        AgentBehavior::Fail => {
            AgentResult::failure(task_id.clone(), format!("{agent_id} could not finish {phase}"))
        }
        _ => AgentResult::success(
            task_id.clone(),
            json!({
                "agent": agent_id.as_str(),
                "phase": phase,
                "output": format!("{phase} done by {agent_id}"),
            }),
        ),
    }
    .with_dispatch(dispatch);

    match store.finish_agent(&agent_id, result).await {
        Ok(true) => debug!(agent_id = %agent_id, task_id = %task_id, "Simulated agent finished"),
        Ok(false) => debug!(agent_id = %agent_id, task_id = %task_id, "Assignment was withdrawn"),
        Err(e) => warn!(agent_id = %agent_id, task_id = %task_id, "Failed to report result: {}", e),
    }
}
