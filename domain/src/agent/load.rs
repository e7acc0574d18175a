//! Load distribution snapshot and reassignment suggestions.

use super::entities::{AgentRecord, Capabilities};
use crate::core::ids::{AgentId, TaskId};
use crate::task::entities::TaskPriority;
use serde::{Deserialize, Serialize};

/// A queued assignment that no idle agent could take
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnassignedTask {
    pub task_id: TaskId,
    pub required_capabilities: Capabilities,
    pub priority: TaskPriority,
}

/// Snapshot of how busy the agent pool is
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadDistribution {
    pub busy_agents: Vec<AgentRecord>,
    pub idle_agents: Vec<AgentRecord>,
    pub unassigned_tasks: Vec<UnassignedTask>,
}

impl LoadDistribution {
    /// Split a list of agents by status.
    pub fn from_agents(agents: Vec<AgentRecord>, unassigned_tasks: Vec<UnassignedTask>) -> Self {
        let (idle_agents, busy_agents) = agents.into_iter().partition(|a| a.is_idle());
        Self {
            busy_agents,
            idle_agents,
            unassigned_tasks,
        }
    }

    pub fn total_agents(&self) -> usize {
        self.busy_agents.len() + self.idle_agents.len()
    }

    /// busy / total, 0.0 for an empty pool
    pub fn busy_ratio(&self) -> f64 {
        let total = self.total_agents();
        if total == 0 {
            0.0
        } else {
            self.busy_agents.len() as f64 / total as f64
        }
    }

    /// Rebalancing only pays off when the pool is saturated yet idle
    /// capacity and waiting work coexist.
    pub fn needs_rebalance(&self, busy_threshold: f64) -> bool {
        self.busy_ratio() > busy_threshold
            && !self.idle_agents.is_empty()
            && !self.unassigned_tasks.is_empty()
    }
}

/// Move `task_id` from one agent to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceSuggestion {
    pub task_id: TaskId,
    pub from_agent: AgentId,
    pub to_agent: AgentId,
}
