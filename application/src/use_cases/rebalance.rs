//! Rebalance use case
//!
//! Moves work between agents when the pool is saturated while idle capacity
//! and queued assignments coexist. The analysis service proposes the moves;
//! this module only applies them, one compare-and-set at a time.

use crate::config::OrchestrationParams;
use crate::ports::analysis::{AnalysisError, AnalysisService};
use crate::ports::message_bus::MessageBus;
use crate::ports::store::SwarmStore;
use crate::use_cases::agent_assignment::{AgentRegistry, AssignmentQueue, Dispatch};
use crate::use_cases::errors::OrchestrationError;
use serde_json::json;
use std::sync::Arc;
use swarm_domain::{
    LoadDistribution, MessageType, RebalanceSuggestion, SwarmEvent, SwarmId, Topic,
};
use tracing::{debug, info, warn};

pub struct Rebalancer {
    store: Arc<dyn SwarmStore>,
    bus: Arc<dyn MessageBus>,
    analysis: Arc<dyn AnalysisService>,
    registry: Arc<AgentRegistry>,
    queue: Arc<AssignmentQueue>,
    params: OrchestrationParams,
}

impl Rebalancer {
    pub fn new(
        store: Arc<dyn SwarmStore>,
        bus: Arc<dyn MessageBus>,
        analysis: Arc<dyn AnalysisService>,
        registry: Arc<AgentRegistry>,
        queue: Arc<AssignmentQueue>,
        params: OrchestrationParams,
    ) -> Self {
        Self {
            store,
            bus,
            analysis,
            registry,
            queue,
            params,
        }
    }

    /// Current load across all agents plus the waiting assignments
    pub async fn load_distribution(&self) -> Result<LoadDistribution, OrchestrationError> {
        let agents = self.store.list_agents(None).await?;
        Ok(LoadDistribution::from_agents(agents, self.queue.unassigned()))
    }

    /// Apply the analysis service's reassignment suggestions if the load
    /// calls for it. Returns the moves actually applied.
    pub async fn rebalance(&self) -> Result<Vec<RebalanceSuggestion>, OrchestrationError> {
        let distribution = self.load_distribution().await?;
        if !distribution.needs_rebalance(self.params.busy_threshold) {
            debug!(
                busy = distribution.busy_agents.len(),
                idle = distribution.idle_agents.len(),
                unassigned = distribution.unassigned_tasks.len(),
                "Load balanced, nothing to do"
            );
            return Ok(Vec::new());
        }

        let suggestions = match tokio::time::timeout(
            self.params.analysis_timeout,
            self.analysis.suggest_rebalance(&distribution),
        )
        .await
        .unwrap_or(Err(AnalysisError::Timeout))
        {
            Ok(suggestions) => suggestions,
            Err(e) => {
                warn!("Rebalance suggestions unavailable: {}", e);
                return Ok(Vec::new());
            }
        };

        let mut applied = Vec::with_capacity(suggestions.len());
        for suggestion in suggestions {
            if self.apply(&suggestion).await? {
                applied.push(suggestion);
            }
        }

        if !applied.is_empty() {
            info!(
                moved = applied.len(),
                busy_ratio = distribution.busy_ratio(),
                "Load rebalanced"
            );
        }
        Ok(applied)
    }

    /// Detach the task from `from` and attach it to `to`.
    ///
    /// `to` is claimed and the handoff recorded before `from` lets go, so a
    /// waiter polling `from` always finds where the task went. Skipped
    /// (returns `false`) when `from` no longer holds the task or `to` is no
    /// longer idle.
    async fn apply(&self, suggestion: &RebalanceSuggestion) -> Result<bool, OrchestrationError> {
        let RebalanceSuggestion {
            task_id,
            from_agent,
            to_agent,
        } = suggestion;

        if from_agent == to_agent {
            return Ok(false);
        }
        let Some(task) = self.store.get_task(task_id).await? else {
            debug!(task_id = %task_id, "Rebalance target task vanished");
            return Ok(false);
        };
        if task.status.is_terminal() {
            return Ok(false);
        }

        let source = match self.store.get_agent(from_agent).await? {
            Some(agent) if agent.holds(task_id) => {
                Dispatch::new(from_agent.clone(), agent.dispatch())
            }
            _ => {
                debug!(agent_id = %from_agent, task_id = %task_id, "Source agent no longer holds task");
                return Ok(false);
            }
        };
        let Some(number) = self.store.claim_agent(to_agent, task_id).await? else {
            debug!(agent_id = %to_agent, "Target agent no longer idle");
            return Ok(false);
        };
        let target = Dispatch::new(to_agent.clone(), number);

        self.registry.record_handoff(task_id, &source, target);
        if !self.store.release_agent(from_agent, task_id).await? {
            debug!(agent_id = %from_agent, task_id = %task_id, "Source agent finished first, undoing move");
            self.registry.cancel_handoff(task_id, &source);
            if !self.store.release_agent(to_agent, task_id).await? {
                warn!(agent_id = %to_agent, task_id = %task_id, "Could not release target agent");
            }
            return Ok(false);
        }
        let assigned = to_agent.clone();
        self.store
            .update_task(
                task_id,
                Box::new(move |t| {
                    t.assign_agent(&assigned);
                }),
            )
            .await?;

        let payload = json!({
            "task_id": task_id,
            "from": from_agent,
            "to": to_agent,
            "dispatch": number,
        });
        self.notify_both(&task.swarm_id, suggestion, payload.clone())
            .await;
        self.bus.publish(
            SwarmEvent::new(Topic::AgentReassigned)
                .with_swarm(&task.swarm_id)
                .with_task(task_id)
                .with_agent(to_agent)
                .with_payload(payload),
        );
        info!(task_id = %task_id, from = %from_agent, to = %to_agent, "Task reassigned");
        Ok(true)
    }

    async fn notify_both(
        &self,
        swarm_id: &SwarmId,
        suggestion: &RebalanceSuggestion,
        payload: serde_json::Value,
    ) {
        for agent_id in [&suggestion.from_agent, &suggestion.to_agent] {
            self.registry
                .notify_agent(swarm_id, agent_id, MessageType::TaskReassignment, payload.clone())
                .await;
        }
    }
}
