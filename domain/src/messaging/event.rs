//! Bus event envelope

use super::topic::Topic;
use crate::core::ids::{AgentId, ProposalId, SwarmId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An event published on the message bus
///
/// The id fields are optional correlation keys; `payload` carries whatever
/// the publisher considers useful (results, scores, error messages).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmEvent {
    pub topic: Topic,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swarm_id: Option<SwarmId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal_id: Option<ProposalId>,
    #[serde(default)]
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl SwarmEvent {
    pub fn new(topic: Topic) -> Self {
        Self {
            topic,
            swarm_id: None,
            task_id: None,
            agent_id: None,
            proposal_id: None,
            payload: Value::Null,
            timestamp: Utc::now(),
        }
    }

    pub fn with_swarm(mut self, swarm_id: &SwarmId) -> Self {
        self.swarm_id = Some(swarm_id.clone());
        self
    }

    pub fn with_task(mut self, task_id: &TaskId) -> Self {
        self.task_id = Some(task_id.clone());
        self
    }

    pub fn with_agent(mut self, agent_id: &AgentId) -> Self {
        self.agent_id = Some(agent_id.clone());
        self
    }

    pub fn with_proposal(mut self, proposal_id: &ProposalId) -> Self {
        self.proposal_id = Some(proposal_id.clone());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }
}
