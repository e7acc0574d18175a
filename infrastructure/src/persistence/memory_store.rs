//! In-memory persistence service.
//!
//! One `tokio::sync::RwLock` per table. The agent compare-and-set methods
//! read, check and write under a single write lock on the agents table,
//! which makes each of them atomic with respect to the others.

use super::rows::{Row, Table};
use async_trait::async_trait;
use std::collections::HashMap;
use swarm_application::{StoreError, SwarmStore, TaskUpdate};
use swarm_domain::{
    AgentId, AgentPerformance, AgentRecord, AgentResult, Communication, ConsensusMetrics,
    ConsensusProposal, ConsensusVote, ProposalId, ProposalStatus, SwarmId, Task, TaskId,
};
use tokio::sync::RwLock;
use tracing::trace;

const TASK: &str = "task";
const AGENT: &str = "agent";
const PROPOSAL: &str = "proposal";
const VOTE: &str = "vote";
const COMMUNICATION: &str = "communication";
const PERFORMANCE: &str = "performance";
const METRICS: &str = "metrics";

#[derive(Default)]
pub struct InMemorySwarmStore {
    tasks: RwLock<Table>,
    agents: RwLock<Table>,
    proposals: RwLock<Table>,
    /// proposal id → votes keyed by agent id
    votes: RwLock<HashMap<String, Table>>,
    communications: RwLock<Vec<Row>>,
    performance: RwLock<Table>,
    metrics: RwLock<Option<Row>>,
}

impl InMemorySwarmStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace an agent's performance history (fixtures and imports).
    pub async fn seed_performance(&self, performance: AgentPerformance) -> Result<(), StoreError> {
        let row = Row::encode(PERFORMANCE, performance.agent_id.as_str(), &performance)?;
        self.performance.write().await.upsert(row);
        Ok(())
    }

    fn task_row(task: &Task) -> Result<Row, StoreError> {
        Ok(Row::encode(TASK, task.id.as_str(), task)?
            .with_swarm(task.swarm_id.as_str())
            .with_status(task.status.as_str()))
    }

    fn agent_row(agent: &AgentRecord) -> Result<Row, StoreError> {
        Ok(Row::encode(AGENT, agent.id.as_str(), agent)?
            .with_swarm(agent.swarm_id.as_str())
            .with_status(agent.status().as_str()))
    }

    fn proposal_row(proposal: &ConsensusProposal) -> Result<Row, StoreError> {
        Ok(Row::encode(PROPOSAL, proposal.id.as_str(), proposal)?
            .with_swarm(proposal.swarm_id.as_str())
            .with_status(proposal.status.as_str()))
    }

    /// Read-check-write on one agent under the table lock
    async fn update_agent_if<F>(&self, agent_id: &AgentId, update: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut AgentRecord) -> bool,
    {
        let changed = self
            .update_agent_with(agent_id, |agent| update(agent).then_some(()))
            .await?;
        Ok(changed.is_some())
    }

    /// Apply `update` under the agents write lock; `None` leaves the row untouched.
    async fn update_agent_with<F, T>(
        &self,
        agent_id: &AgentId,
        update: F,
    ) -> Result<Option<T>, StoreError>
    where
        F: FnOnce(&mut AgentRecord) -> Option<T>,
    {
        let mut agents = self.agents.write().await;
        let row = agents
            .get(agent_id.as_str())
            .ok_or_else(|| StoreError::not_found(AGENT, agent_id))?;
        let mut agent: AgentRecord = row.decode(AGENT)?;
        let Some(value) = update(&mut agent) else {
            return Ok(None);
        };
        agents.upsert(Self::agent_row(&agent)?);
        Ok(Some(value))
    }
}

fn in_swarm(row: &Row, swarm_id: Option<&SwarmId>) -> bool {
    swarm_id.is_none_or(|s| row.swarm_id.as_deref() == Some(s.as_str()))
}

#[async_trait]
impl SwarmStore for InMemorySwarmStore {
    // ==================== Tasks ====================

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        self.tasks
            .read()
            .await
            .get(id.as_str())
            .map(|row| row.decode(TASK))
            .transpose()
    }

    async fn save_task(&self, task: &Task) -> Result<(), StoreError> {
        self.tasks.write().await.upsert(Self::task_row(task)?);
        Ok(())
    }

    async fn list_tasks(&self, swarm_id: Option<&SwarmId>) -> Result<Vec<Task>, StoreError> {
        self.tasks
            .read()
            .await
            .iter()
            .filter(|row| in_swarm(row, swarm_id))
            .map(|row| row.decode(TASK))
            .collect()
    }

    async fn update_task(&self, id: &TaskId, update: TaskUpdate) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        let mut task: Task = tasks
            .get(id.as_str())
            .ok_or_else(|| StoreError::not_found(TASK, id))?
            .decode(TASK)?;
        update(&mut task);
        tasks.upsert(Self::task_row(&task)?);
        trace!(task_id = %id, status = %task.status, "Task updated");
        Ok(task)
    }

    // ==================== Agents ====================

    async fn get_agent(&self, id: &AgentId) -> Result<Option<AgentRecord>, StoreError> {
        self.agents
            .read()
            .await
            .get(id.as_str())
            .map(|row| row.decode(AGENT))
            .transpose()
    }

    async fn save_agent(&self, agent: &AgentRecord) -> Result<(), StoreError> {
        self.agents.write().await.upsert(Self::agent_row(agent)?);
        Ok(())
    }

    async fn list_agents(
        &self,
        swarm_id: Option<&SwarmId>,
    ) -> Result<Vec<AgentRecord>, StoreError> {
        self.agents
            .read()
            .await
            .iter()
            .filter(|row| in_swarm(row, swarm_id))
            .map(|row| row.decode(AGENT))
            .collect()
    }

    async fn claim_agent(
        &self,
        agent_id: &AgentId,
        task_id: &TaskId,
    ) -> Result<Option<u64>, StoreError> {
        self.update_agent_with(agent_id, |agent| {
            agent.is_idle().then(|| agent.attach(task_id.clone()))
        })
        .await
    }

    async fn release_agent(
        &self,
        agent_id: &AgentId,
        task_id: &TaskId,
    ) -> Result<bool, StoreError> {
        self.update_agent_if(agent_id, |agent| {
            if !agent.holds(task_id) {
                return false;
            }
            agent.detach();
            true
        })
        .await
    }

    async fn finish_agent(
        &self,
        agent_id: &AgentId,
        result: AgentResult,
    ) -> Result<bool, StoreError> {
        self.update_agent_if(agent_id, |agent| {
            if !agent.accepts(&result) {
                return false;
            }
            agent.complete(result);
            true
        })
        .await
    }

    // ==================== Proposals & votes ====================

    async fn create_proposal(&self, proposal: &ConsensusProposal) -> Result<(), StoreError> {
        let mut proposals = self.proposals.write().await;
        if proposals.contains(proposal.id.as_str()) {
            return Err(StoreError::Duplicate {
                kind: PROPOSAL,
                id: proposal.id.to_string(),
            });
        }
        proposals.upsert(Self::proposal_row(proposal)?);
        Ok(())
    }

    async fn get_proposal(&self, id: &ProposalId) -> Result<Option<ConsensusProposal>, StoreError> {
        self.proposals
            .read()
            .await
            .get(id.as_str())
            .map(|row| row.decode(PROPOSAL))
            .transpose()
    }

    async fn update_proposal(&self, proposal: &ConsensusProposal) -> Result<(), StoreError> {
        let mut proposals = self.proposals.write().await;
        if !proposals.contains(proposal.id.as_str()) {
            return Err(StoreError::not_found(PROPOSAL, &proposal.id));
        }
        proposals.upsert(Self::proposal_row(proposal)?);
        Ok(())
    }

    async fn list_open_proposals(&self) -> Result<Vec<ConsensusProposal>, StoreError> {
        let open = ProposalStatus::Open.as_str();
        self.proposals
            .read()
            .await
            .iter()
            .filter(|row| row.status.as_deref() == Some(open))
            .map(|row| row.decode(PROPOSAL))
            .collect()
    }

    async fn record_vote(
        &self,
        vote: &ConsensusVote,
    ) -> Result<Option<ConsensusVote>, StoreError> {
        let row = Row::encode(VOTE, vote.agent_id.as_str(), vote)?;
        let previous = self
            .votes
            .write()
            .await
            .entry(vote.proposal_id.to_string())
            .or_default()
            .upsert(row);
        previous.map(|row| row.decode(VOTE)).transpose()
    }

    async fn list_votes(&self, proposal_id: &ProposalId) -> Result<Vec<ConsensusVote>, StoreError> {
        match self.votes.read().await.get(proposal_id.as_str()) {
            Some(table) => table.iter().map(|row| row.decode(VOTE)).collect(),
            None => Ok(Vec::new()),
        }
    }

    // ==================== Communications ====================

    async fn create_communication(&self, communication: &Communication) -> Result<(), StoreError> {
        let mut communications = self.communications.write().await;
        let key = communications.len().to_string();
        let row = Row::encode(COMMUNICATION, key, communication)?
            .with_swarm(communication.swarm_id.as_str());
        communications.push(row);
        Ok(())
    }

    async fn list_communications(
        &self,
        swarm_id: &SwarmId,
    ) -> Result<Vec<Communication>, StoreError> {
        self.communications
            .read()
            .await
            .iter()
            .filter(|row| in_swarm(row, Some(swarm_id)))
            .map(|row| row.decode(COMMUNICATION))
            .collect()
    }

    // ==================== Performance & metrics ====================

    async fn get_performance(
        &self,
        agent_id: &AgentId,
    ) -> Result<Option<AgentPerformance>, StoreError> {
        self.performance
            .read()
            .await
            .get(agent_id.as_str())
            .map(|row| row.decode(PERFORMANCE))
            .transpose()
    }

    async fn record_performance(
        &self,
        agent_id: &AgentId,
        success: bool,
    ) -> Result<AgentPerformance, StoreError> {
        let mut table = self.performance.write().await;
        let mut performance = match table.get(agent_id.as_str()) {
            Some(row) => row.decode(PERFORMANCE)?,
            None => AgentPerformance::new(agent_id.clone()),
        };
        performance.record(success);
        table.upsert(Row::encode(PERFORMANCE, agent_id.as_str(), &performance)?);
        Ok(performance)
    }

    async fn save_metrics(&self, metrics: &ConsensusMetrics) -> Result<(), StoreError> {
        *self.metrics.write().await = Some(Row::encode(METRICS, METRICS, metrics)?);
        Ok(())
    }

    async fn get_metrics(&self) -> Result<Option<ConsensusMetrics>, StoreError> {
        self.metrics
            .read()
            .await
            .as_ref()
            .map(|row| row.decode(METRICS))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use swarm_domain::{MessageType, TaskStatus};

    fn agent(id: &str) -> AgentRecord {
        AgentRecord::new(id, "swarm", "coder").with_capability("execution")
    }

    #[tokio::test]
    async fn test_task_round_trip_keeps_payloads() {
        let store = InMemorySwarmStore::new();
        let mut task = Task::new("t1", "swarm", "build it").with_capability("execution");
        task.mark_completed(json!({ "summary": { "successful_phases": 2 } }));
        store.save_task(&task).await.unwrap();

        let loaded = store.get_task(&task.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, TaskStatus::Completed);
        assert_eq!(loaded.result, task.result);
        assert_eq!(loaded.required_capabilities, task.required_capabilities);
    }

    #[tokio::test]
    async fn test_update_missing_task_is_not_found() {
        let store = InMemorySwarmStore::new();
        let err = store
            .update_task(&TaskId::new("nope"), Box::new(|_| {}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "task", .. }));
    }

    #[tokio::test]
    async fn test_claim_is_single_writer() {
        let store = InMemorySwarmStore::new();
        store.save_agent(&agent("a1")).await.unwrap();
        let a1 = AgentId::new("a1");

        assert_eq!(store.claim_agent(&a1, &TaskId::new("t1")).await.unwrap(), Some(1));
        assert_eq!(store.claim_agent(&a1, &TaskId::new("t2")).await.unwrap(), None);

        let stored = store.get_agent(&a1).await.unwrap().unwrap();
        assert_eq!(stored.current_task(), Some(&TaskId::new("t1")));
        assert!(stored.is_consistent());
    }

    #[tokio::test]
    async fn test_release_and_finish_require_holding_the_task() {
        let store = InMemorySwarmStore::new();
        store.save_agent(&agent("a1")).await.unwrap();
        let a1 = AgentId::new("a1");
        let t1 = TaskId::new("t1");
        store.claim_agent(&a1, &t1).await.unwrap();

        assert!(!store.release_agent(&a1, &TaskId::new("other")).await.unwrap());
        assert!(
            !store
                .finish_agent(&a1, AgentResult::success(TaskId::new("other"), json!(null)))
                .await
                .unwrap()
        );
        assert!(
            store
                .finish_agent(&a1, AgentResult::success(t1.clone(), json!({ "ok": true })))
                .await
                .unwrap()
        );

        let stored = store.get_agent(&a1).await.unwrap().unwrap();
        assert!(stored.is_idle());
        assert!(stored.is_consistent());
        assert_eq!(stored.last_result.unwrap().task_id, t1);
    }

    #[tokio::test]
    async fn test_finish_rejects_a_result_for_an_older_claim() {
        let store = InMemorySwarmStore::new();
        store.save_agent(&agent("a1")).await.unwrap();
        let a1 = AgentId::new("a1");
        let t1 = TaskId::new("t1");

        let first = store.claim_agent(&a1, &t1).await.unwrap().unwrap();
        assert!(store.release_agent(&a1, &t1).await.unwrap());
        let second = store.claim_agent(&a1, &t1).await.unwrap().unwrap();
        assert_ne!(first, second);

        let late = AgentResult::success(t1.clone(), json!("late")).with_dispatch(first);
        assert!(!store.finish_agent(&a1, late).await.unwrap());
        let stored = store.get_agent(&a1).await.unwrap().unwrap();
        assert!(stored.holds(&t1));
        assert!(stored.last_result.is_none());

        let fresh = AgentResult::success(t1.clone(), json!("fresh")).with_dispatch(second);
        assert!(store.finish_agent(&a1, fresh).await.unwrap());
        let stored = store.get_agent(&a1).await.unwrap().unwrap();
        assert!(stored.is_idle());
        assert_eq!(stored.last_result.map(|r| r.dispatch), Some(second));
    }

    #[tokio::test]
    async fn test_last_vote_wins_and_keeps_order() {
        let store = InMemorySwarmStore::new();
        let p = ProposalId::new("p1");

        assert!(store.record_vote(&ConsensusVote::approve("p1", "a")).await.unwrap().is_none());
        store.record_vote(&ConsensusVote::approve("p1", "b")).await.unwrap();
        let previous = store
            .record_vote(&ConsensusVote::reject("p1", "a"))
            .await
            .unwrap()
            .unwrap();
        assert!(previous.vote);

        let votes = store.list_votes(&p).await.unwrap();
        assert_eq!(votes.len(), 2);
        assert_eq!(votes[0].agent_id, AgentId::new("a"));
        assert!(!votes[0].vote);
    }

    #[tokio::test]
    async fn test_open_proposals_follow_status_column() {
        let store = InMemorySwarmStore::new();
        let open = ConsensusProposal::new("swarm", json!({}), 0.5).unwrap();
        let mut closed = ConsensusProposal::new("swarm", json!({}), 0.5).unwrap();
        store.create_proposal(&open).await.unwrap();
        store.create_proposal(&closed).await.unwrap();
        assert!(store.create_proposal(&open).await.is_err());

        closed.status = ProposalStatus::Failed;
        store.update_proposal(&closed).await.unwrap();

        let listed = store.list_open_proposals().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, open.id);
    }

    #[tokio::test]
    async fn test_communications_filtered_by_swarm() {
        let store = InMemorySwarmStore::new();
        let ours = SwarmId::new("ours");
        store
            .create_communication(&Communication::broadcast(
                ours.clone(),
                MessageType::VotingRequest,
                json!({ "proposal_id": "p1" }),
            ))
            .await
            .unwrap();
        store
            .create_communication(&Communication::broadcast(
                SwarmId::new("theirs"),
                MessageType::VotingRequest,
                json!({}),
            ))
            .await
            .unwrap();

        let listed = store.list_communications(&ours).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].payload["proposal_id"], "p1");
    }

    #[tokio::test]
    async fn test_performance_counts() {
        let store = InMemorySwarmStore::new();
        let a1 = AgentId::new("a1");
        store.record_performance(&a1, true).await.unwrap();
        let perf = store.record_performance(&a1, false).await.unwrap();
        assert_eq!(perf.completed, 2);
        assert_eq!(perf.success_rate(), 0.5);
    }
}
