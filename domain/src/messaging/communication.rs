//! Addressed agent communications

use crate::core::ids::{AgentId, SwarmId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who a communication is for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "agent_id", rename_all = "snake_case")]
pub enum Recipient {
    Agent(AgentId),
    Broadcast,
}

impl Recipient {
    /// Does this communication reach `agent_id`?
    pub fn includes(&self, agent_id: &AgentId) -> bool {
        match self {
            Recipient::Agent(id) => id == agent_id,
            Recipient::Broadcast => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    TaskAssignment,
    TaskCancellation,
    TaskReassignment,
    VotingRequest,
    ConsensusResult,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::TaskAssignment => "task_assignment",
            MessageType::TaskCancellation => "task_cancellation",
            MessageType::TaskReassignment => "task_reassignment",
            MessageType::VotingRequest => "voting_request",
            MessageType::ConsensusResult => "consensus_result",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessagePriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// A message from the coordinator (or an agent) to one agent or a whole swarm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Communication {
    /// `None` when sent by the coordinator itself
    pub sender: Option<AgentId>,
    pub recipient: Recipient,
    pub swarm_id: SwarmId,
    pub message_type: MessageType,
    pub payload: Value,
    #[serde(default)]
    pub priority: MessagePriority,
    #[serde(default)]
    pub requires_response: bool,
    pub timestamp: DateTime<Utc>,
}

impl Communication {
    pub fn to_agent(
        swarm_id: SwarmId,
        agent_id: AgentId,
        message_type: MessageType,
        payload: Value,
    ) -> Self {
        Self {
            sender: None,
            recipient: Recipient::Agent(agent_id),
            swarm_id,
            message_type,
            payload,
            priority: MessagePriority::Normal,
            requires_response: false,
            timestamp: Utc::now(),
        }
    }

    pub fn broadcast(swarm_id: SwarmId, message_type: MessageType, payload: Value) -> Self {
        Self {
            sender: None,
            recipient: Recipient::Broadcast,
            swarm_id,
            message_type,
            payload,
            priority: MessagePriority::Normal,
            requires_response: false,
            timestamp: Utc::now(),
        }
    }

    pub fn from_agent(mut self, sender: AgentId) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn expecting_response(mut self) -> Self {
        self.requires_response = true;
        self
    }
}
