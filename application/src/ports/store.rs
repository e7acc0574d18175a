//! Persistence port
//!
//! Durable records for tasks, agents, proposals, votes, communications,
//! agent performance and consensus metrics.

use async_trait::async_trait;
use swarm_domain::{
    AgentId, AgentPerformance, AgentRecord, AgentResult, Communication, ConsensusMetrics,
    ConsensusProposal, ConsensusVote, ProposalId, SwarmId, Task, TaskId,
};
use thiserror::Error;

/// In-place task mutation handed to [`SwarmStore::update_task`]
pub type TaskUpdate = Box<dyn FnOnce(&mut Task) + Send>;

/// Errors raised by a [`SwarmStore`] adapter
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} already exists: {id}")]
    Duplicate { kind: &'static str, id: String },

    #[error("Corrupt {kind} record {id}: {reason}")]
    Corrupt {
        kind: &'static str,
        id: String,
        reason: String,
    },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Persistence service
///
/// The agent assignment fields (status and current task) are only ever
/// changed through the compare-and-set methods [`claim_agent`],
/// [`release_agent`] and [`finish_agent`]; adapters must make each of them
/// atomic with respect to the others.
///
/// [`claim_agent`]: SwarmStore::claim_agent
/// [`release_agent`]: SwarmStore::release_agent
/// [`finish_agent`]: SwarmStore::finish_agent
#[async_trait]
pub trait SwarmStore: Send + Sync {
    // ==================== Tasks ====================

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError>;

    /// Insert or replace a task record
    async fn save_task(&self, task: &Task) -> Result<(), StoreError>;

    async fn list_tasks(&self, swarm_id: Option<&SwarmId>) -> Result<Vec<Task>, StoreError>;

    /// Apply `update` to the stored task under the table lock and return the
    /// updated record. Concurrent writers never lose each other's changes.
    async fn update_task(&self, id: &TaskId, update: TaskUpdate) -> Result<Task, StoreError>;

    // ==================== Agents ====================

    async fn get_agent(&self, id: &AgentId) -> Result<Option<AgentRecord>, StoreError>;

    /// Insert or replace an agent record (registration)
    async fn save_agent(&self, agent: &AgentRecord) -> Result<(), StoreError>;

    async fn list_agents(&self, swarm_id: Option<&SwarmId>)
    -> Result<Vec<AgentRecord>, StoreError>;

    /// Point an idle agent at a task and mark it busy.
    ///
    /// Returns the dispatch number of the new claim, or `Ok(None)` without
    /// changing anything when the agent is busy.
    async fn claim_agent(
        &self,
        agent_id: &AgentId,
        task_id: &TaskId,
    ) -> Result<Option<u64>, StoreError>;

    /// Clear the agent's pointer if it still holds `task_id`.
    ///
    /// Returns `Ok(false)` when the agent holds another task or none.
    async fn release_agent(&self, agent_id: &AgentId, task_id: &TaskId)
    -> Result<bool, StoreError>;

    /// Store the agent's result and release it, if the result answers the
    /// claim the agent currently holds.
    async fn finish_agent(&self, agent_id: &AgentId, result: AgentResult)
    -> Result<bool, StoreError>;

    // ==================== Proposals & votes ====================

    async fn create_proposal(&self, proposal: &ConsensusProposal) -> Result<(), StoreError>;

    async fn get_proposal(&self, id: &ProposalId) -> Result<Option<ConsensusProposal>, StoreError>;

    async fn update_proposal(&self, proposal: &ConsensusProposal) -> Result<(), StoreError>;

    async fn list_open_proposals(&self) -> Result<Vec<ConsensusProposal>, StoreError>;

    /// Record a vote, replacing any earlier vote by the same agent.
    ///
    /// Returns the replaced vote.
    async fn record_vote(&self, vote: &ConsensusVote)
    -> Result<Option<ConsensusVote>, StoreError>;

    /// Votes on a proposal, in the order they were first cast
    async fn list_votes(&self, proposal_id: &ProposalId) -> Result<Vec<ConsensusVote>, StoreError>;

    // ==================== Communications ====================

    async fn create_communication(&self, communication: &Communication) -> Result<(), StoreError>;

    async fn list_communications(&self, swarm_id: &SwarmId)
    -> Result<Vec<Communication>, StoreError>;

    // ==================== Performance & metrics ====================

    async fn get_performance(
        &self,
        agent_id: &AgentId,
    ) -> Result<Option<AgentPerformance>, StoreError>;

    /// Count one finished dispatch for the agent and return the new record
    async fn record_performance(
        &self,
        agent_id: &AgentId,
        success: bool,
    ) -> Result<AgentPerformance, StoreError>;

    async fn save_metrics(&self, metrics: &ConsensusMetrics) -> Result<(), StoreError>;

    async fn get_metrics(&self) -> Result<Option<ConsensusMetrics>, StoreError>;
}
