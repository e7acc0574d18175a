//! Consensus Engine use case
//!
//! Proposals move `open → {achieved | failed}` exactly once. Every path that
//! can resolve a proposal (a vote, a deadline, the proposal monitor) runs
//! under one resolution lock, so a proposal is evaluated by one caller at a
//! time and its stored result never changes afterwards.
//!
//! ```text
//! create_proposal ──► open ──┬── submit_vote ──► evaluate ──► achieved / failed
//!                            └── deadline ────► evaluate (forced) ──┘
//! ```

use crate::config::ConsensusParams;
use crate::ports::analysis::{AnalysisError, AnalysisService};
use crate::ports::message_bus::MessageBus;
use crate::ports::store::SwarmStore;
use crate::use_cases::errors::{ConsensusError, OrchestrationError};
use crate::use_cases::supervise_task::TaskSupervisor;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use swarm_domain::{
    AgentId, Communication, ConsensusMetrics, ConsensusOutcome, ConsensusProposal,
    ConsensusResult, ConsensusVote, DecisionAction, MessageType, ProposalAssessment, ProposalId,
    ProposalStatus, SwarmEvent, SwarmId, TaskId, TaskStatus, Topic, VoteTally,
    VotingRecommendation, VotingStrategy, consensus,
};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Point-in-time view of a proposal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposalSnapshot {
    pub proposal_id: ProposalId,
    pub status: ProposalStatus,
    pub threshold: f64,
    pub min_participation: f64,
    pub deadline: Option<DateTime<Utc>>,
    pub strategy: VotingStrategy,
    pub positive_votes: usize,
    pub negative_votes: usize,
    pub total_votes: usize,
    pub eligible_voters: usize,
    pub ratio: f64,
    /// e.g. `[●●○]`
    pub vote_summary: String,
    /// Frozen once the proposal resolves
    pub result: Option<ConsensusResult>,
}

pub struct ConsensusEngine {
    store: Arc<dyn SwarmStore>,
    bus: Arc<dyn MessageBus>,
    analysis: Arc<dyn AnalysisService>,
    params: ConsensusParams,
    analysis_timeout: Duration,
    supervisor: Option<Arc<TaskSupervisor>>,
    active: RwLock<HashSet<ProposalId>>,
    resolution: tokio::sync::Mutex<()>,
    metrics: Mutex<ConsensusMetrics>,
    shutdown: CancellationToken,
}

impl ConsensusEngine {
    pub fn new(
        store: Arc<dyn SwarmStore>,
        bus: Arc<dyn MessageBus>,
        analysis: Arc<dyn AnalysisService>,
        params: ConsensusParams,
    ) -> Self {
        Self {
            store,
            bus,
            analysis,
            params,
            analysis_timeout: Duration::from_secs(10),
            supervisor: None,
            active: RwLock::new(HashSet::new()),
            resolution: tokio::sync::Mutex::new(()),
            metrics: Mutex::new(ConsensusMetrics::default()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Route `cancel_task` decisions through a running supervisor so live
    /// executions stop and their agents are released.
    pub fn with_supervisor(mut self, supervisor: Arc<TaskSupervisor>) -> Self {
        self.supervisor = Some(supervisor);
        self
    }

    pub fn with_analysis_timeout(mut self, timeout: Duration) -> Self {
        self.analysis_timeout = timeout;
        self
    }

    pub fn params(&self) -> &ConsensusParams {
        &self.params
    }

    /// A proposal with the configured defaults applied
    pub fn draft(
        &self,
        swarm_id: impl Into<SwarmId>,
        decision: Value,
        threshold: Option<f64>,
    ) -> Result<ConsensusProposal, ConsensusError> {
        let proposal = ConsensusProposal::new(
            swarm_id,
            decision,
            threshold.unwrap_or(self.params.default_threshold),
        )?
        .with_min_participation(self.params.min_participation);
        Ok(proposal)
    }

    // ==================== Proposals ====================

    /// Open a proposal for voting.
    ///
    /// Without explicit voters the swarm's current agents become the
    /// electorate. A voting request is broadcast and, when a deadline is
    /// set, a one-shot task forces evaluation once it passes.
    pub async fn create_proposal(
        self: &Arc<Self>,
        proposal: ConsensusProposal,
    ) -> Result<ConsensusProposal, ConsensusError> {
        proposal.validate()?;

        let mut proposal = proposal;
        if proposal.eligible_voters.is_empty() {
            proposal.eligible_voters = self
                .store
                .list_agents(Some(&proposal.swarm_id))
                .await?
                .into_iter()
                .map(|a| a.id)
                .collect();
        }

        self.store.create_proposal(&proposal).await?;
        self.active.write().await.insert(proposal.id.clone());

        let request = json!({
            "proposal_id": proposal.id,
            "decision": proposal.decision,
            "threshold": proposal.required_threshold,
            "deadline": proposal.deadline,
            "strategy": proposal.voting_strategy().as_str(),
        });
        let message = Communication::broadcast(
            proposal.swarm_id.clone(),
            MessageType::VotingRequest,
            request.clone(),
        )
        .expecting_response();
        if let Err(e) = self.store.create_communication(&message).await {
            warn!(proposal_id = %proposal.id, "Failed to store voting request: {}", e);
        }
        let mut created = SwarmEvent::new(Topic::ProposalCreated)
            .with_swarm(&proposal.swarm_id)
            .with_proposal(&proposal.id)
            .with_payload(request);
        if let Some(task_id) = &proposal.task_id {
            created = created.with_task(task_id);
        }
        self.bus.publish(created);
        info!(
            proposal_id = %proposal.id,
            threshold = proposal.required_threshold,
            voters = proposal.eligible_voters.len(),
            "Proposal created"
        );

        if let Some(deadline) = proposal.deadline {
            self.spawn_deadline(proposal.id.clone(), deadline);
        }

        // An empty electorate can never vote; settle it now.
        if proposal.eligible_voters.is_empty() {
            let _guard = self.resolution.lock().await;
            self.evaluate_locked(proposal.clone(), false).await?;
        }

        Ok(proposal)
    }

    fn spawn_deadline(self: &Arc<Self>, proposal_id: ProposalId, deadline: DateTime<Utc>) {
        let wait = (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = engine.shutdown.cancelled() => {}
                _ = tokio::time::sleep(wait) => {
                    if let Err(e) = engine.force_deadline(&proposal_id).await {
                        warn!(proposal_id = %proposal_id, "Deadline evaluation failed: {}", e);
                    }
                }
            }
        });
    }

    // ==================== Voting ====================

    /// Record a vote and re-evaluate the proposal.
    ///
    /// A second vote from the same agent replaces the first.
    pub async fn submit_vote(&self, vote: ConsensusVote) -> Result<ConsensusOutcome, ConsensusError> {
        let _guard = self.resolution.lock().await;

        let proposal = self.load(&vote.proposal_id).await?;
        if !proposal.is_open() {
            return Err(ConsensusError::InvalidVote(format!(
                "proposal {} is already {}",
                proposal.id,
                proposal.status.as_str()
            )));
        }
        if proposal.deadline_passed(Utc::now()) {
            return Err(ConsensusError::InvalidVote(format!(
                "deadline of proposal {} has passed",
                proposal.id
            )));
        }
        if !proposal.is_eligible(&vote.agent_id) {
            return Err(ConsensusError::InvalidVote(format!(
                "agent {} is not an eligible voter on proposal {}",
                vote.agent_id, proposal.id
            )));
        }

        if let Some(previous) = self.store.record_vote(&vote).await? {
            debug!(
                proposal_id = %vote.proposal_id,
                agent_id = %vote.agent_id,
                previous = previous.vote,
                current = vote.vote,
                "Vote replaced"
            );
        }
        self.bus.publish(
            SwarmEvent::new(Topic::VoteSubmitted)
                .with_swarm(&proposal.swarm_id)
                .with_proposal(&proposal.id)
                .with_agent(&vote.agent_id)
                .with_payload(json!({ "vote": vote.vote, "reason": vote.reason })),
        );

        self.evaluate_locked(proposal, false).await
    }

    /// Advisory vote for an agent, derived from the proposal's voting
    /// strategy and the analysis service's assessment.
    pub async fn get_voting_recommendation(
        &self,
        proposal_id: &ProposalId,
        agent_id: &AgentId,
    ) -> Result<VotingRecommendation, ConsensusError> {
        let proposal = self.load(proposal_id).await?;
        let agent = self
            .store
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| ConsensusError::AgentNotFound(agent_id.clone()))?;

        let assessment = match tokio::time::timeout(
            self.analysis_timeout,
            self.analysis.assess_proposal(&proposal, &agent.agent_type),
        )
        .await
        .unwrap_or(Err(AnalysisError::Timeout))
        {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!(proposal_id = %proposal_id, "Proposal assessment unavailable: {}", e);
                ProposalAssessment::default()
            }
        };

        Ok(VotingRecommendation::new(
            proposal.id.clone(),
            agent.id,
            proposal.voting_strategy(),
            &assessment,
        ))
    }

    // ==================== Status ====================

    pub async fn get_proposal_status(
        &self,
        proposal_id: &ProposalId,
    ) -> Result<ProposalSnapshot, ConsensusError> {
        let proposal = self.load(proposal_id).await?;
        let tally = VoteTally::from_votes(self.store.list_votes(proposal_id).await?);

        let (positive_votes, negative_votes, total_votes, ratio) = match &proposal.result {
            Some(r) => (r.positive_votes, r.negative_votes, r.total_votes, r.ratio),
            None => (tally.positive, tally.negative, tally.total(), tally.ratio()),
        };

        Ok(ProposalSnapshot {
            proposal_id: proposal.id.clone(),
            status: proposal.status,
            threshold: proposal.required_threshold,
            min_participation: proposal.min_participation,
            deadline: proposal.deadline,
            strategy: proposal.voting_strategy(),
            positive_votes,
            negative_votes,
            total_votes,
            eligible_voters: proposal.eligible_voters.len(),
            ratio,
            vote_summary: tally.vote_summary(),
            result: proposal.result.clone(),
        })
    }

    pub async fn active_proposals(&self) -> Vec<ProposalId> {
        let mut ids: Vec<ProposalId> = self.active.read().await.iter().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    // ==================== Background Work ====================

    /// Re-evaluate every open proposal, adopting ones this engine did not
    /// create. Returns how many resolved.
    pub async fn monitor_open_proposals(&self) -> Result<usize, ConsensusError> {
        let open = self.store.list_open_proposals().await?;
        let mut resolved = 0;
        for proposal in open {
            let id = proposal.id.clone();
            if self.active.write().await.insert(id.clone()) {
                debug!(proposal_id = %id, "Adopted open proposal");
            }
            let _guard = self.resolution.lock().await;
            let current = self.load(&id).await?;
            if self.evaluate_locked(current, false).await?.is_resolved() {
                resolved += 1;
            }
        }
        Ok(resolved)
    }

    /// Force every open proposal whose deadline has passed.
    pub async fn check_deadlines(&self) -> Result<usize, ConsensusError> {
        let now = Utc::now();
        let due: Vec<ProposalId> = self
            .store
            .list_open_proposals()
            .await?
            .into_iter()
            .filter(|p| p.deadline_passed(now))
            .map(|p| p.id)
            .collect();

        for proposal_id in &due {
            self.force_deadline(proposal_id).await?;
        }
        Ok(due.len())
    }

    /// Evaluate as if the deadline had passed: not achieved means failed.
    ///
    /// A proposal that already resolved reports its stored outcome.
    pub async fn force_deadline(
        &self,
        proposal_id: &ProposalId,
    ) -> Result<ConsensusOutcome, ConsensusError> {
        let _guard = self.resolution.lock().await;
        let proposal = self.load(proposal_id).await?;
        if !proposal.is_open() {
            return Ok(stored_outcome(&proposal));
        }
        debug!(proposal_id = %proposal_id, "Deadline reached");
        self.evaluate_locked(proposal, true).await
    }

    pub fn metrics(&self) -> ConsensusMetrics {
        self.metrics
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub async fn load_metrics(&self) -> Result<(), ConsensusError> {
        if let Some(stored) = self.store.get_metrics().await?
            && let Ok(mut metrics) = self.metrics.lock()
        {
            *metrics = stored;
        }
        Ok(())
    }

    pub async fn persist_metrics(&self) -> Result<ConsensusMetrics, ConsensusError> {
        let snapshot = self.metrics();
        self.store.save_metrics(&snapshot).await?;
        debug!(
            achieved = snapshot.achieved,
            failed = snapshot.failed,
            average_participation = snapshot.average_participation,
            "Consensus metrics persisted"
        );
        Ok(snapshot)
    }

    /// Stop pending deadline timers
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    // ==================== Resolution ====================

    async fn load(&self, proposal_id: &ProposalId) -> Result<ConsensusProposal, ConsensusError> {
        let proposal = self
            .store
            .get_proposal(proposal_id)
            .await?
            .ok_or_else(|| ConsensusError::ProposalNotFound(proposal_id.clone()))?;
        proposal.validate()?;
        Ok(proposal)
    }

    /// Tally, decide and (if decided) resolve. Caller holds the resolution lock.
    async fn evaluate_locked(
        &self,
        proposal: ConsensusProposal,
        forced: bool,
    ) -> Result<ConsensusOutcome, ConsensusError> {
        let tally = VoteTally::from_votes(self.store.list_votes(&proposal.id).await?);
        let outcome = consensus::evaluate(&proposal, &tally, forced);
        if let Some(result) = outcome.result() {
            self.resolve(proposal, result.clone()).await?;
        }
        Ok(outcome)
    }

    async fn resolve(
        &self,
        mut proposal: ConsensusProposal,
        result: ConsensusResult,
    ) -> Result<(), ConsensusError> {
        if !proposal.resolve(result.clone()) {
            return Ok(());
        }
        self.store.update_proposal(&proposal).await?;
        self.active.write().await.remove(&proposal.id);

        info!(
            proposal_id = %proposal.id,
            achieved = result.achieved,
            ratio = result.ratio,
            participation = result.participation_rate,
            reason = %result.reason,
            "Proposal resolved"
        );

        if let Err(e) = self.apply_decision(&proposal, &result).await {
            warn!(proposal_id = %proposal.id, "Failed to apply decision: {}", e);
        }

        let payload = serde_json::to_value(&result).unwrap_or(Value::Null);
        let message = Communication::broadcast(
            proposal.swarm_id.clone(),
            MessageType::ConsensusResult,
            payload.clone(),
        );
        if let Err(e) = self.store.create_communication(&message).await {
            warn!(proposal_id = %proposal.id, "Failed to store consensus result: {}", e);
        }

        let topic = if result.achieved {
            Topic::ConsensusAchieved
        } else {
            Topic::ConsensusFailed
        };
        let mut event = SwarmEvent::new(topic)
            .with_swarm(&proposal.swarm_id)
            .with_proposal(&proposal.id)
            .with_payload(payload);
        if let Some(task_id) = &proposal.task_id {
            event = event.with_task(task_id);
        }
        self.bus.publish(event);

        let duration_ms = (Utc::now() - proposal.created_at)
            .num_milliseconds()
            .max(0) as u64;
        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.record(&result, duration_ms);
        }
        Ok(())
    }

    /// Act on the linked task. Only achieved proposals change a task, except
    /// that a failed approval also fails the task waiting on it.
    async fn apply_decision(
        &self,
        proposal: &ConsensusProposal,
        result: &ConsensusResult,
    ) -> Result<(), OrchestrationError> {
        let (Some(task_id), Some(action)) = (&proposal.task_id, proposal.action()) else {
            return Ok(());
        };

        match (result.achieved, action) {
            (true, DecisionAction::ApproveTask) => {
                self.release_gate(task_id, proposal, None).await
            }
            (true, DecisionAction::ModifyTask(modifications)) => {
                self.release_gate(task_id, proposal, Some(modifications))
                    .await
            }
            (true, DecisionAction::CancelTask) => {
                let reason = Some(format!("cancelled by proposal {}", proposal.id));
                match &self.supervisor {
                    Some(supervisor) => match supervisor.cancel(task_id, reason).await {
                        Err(OrchestrationError::TaskNotActive(_)) => Ok(()),
                        other => other,
                    },
                    None => {
                        let task = self
                            .store
                            .update_task(
                                task_id,
                                Box::new(move |t| {
                                    if !t.status.is_terminal() {
                                        t.mark_cancelled(reason);
                                    }
                                }),
                            )
                            .await?;
                        self.bus.publish(
                            SwarmEvent::new(Topic::TaskCancelled)
                                .with_swarm(&task.swarm_id)
                                .with_task(task_id),
                        );
                        Ok(())
                    }
                }
            }
            (false, DecisionAction::ApproveTask) => {
                let message = format!("consensus not achieved on proposal {}", proposal.id);
                let recorded = message.clone();
                let task = self
                    .store
                    .update_task(
                        task_id,
                        Box::new(move |t| {
                            if t.status == TaskStatus::AwaitingConsensus {
                                t.mark_failed(recorded);
                            }
                        }),
                    )
                    .await?;
                if task.status == TaskStatus::Failed {
                    self.bus.publish(
                        SwarmEvent::new(Topic::TaskFailed)
                            .with_swarm(&task.swarm_id)
                            .with_task(task_id)
                            .with_payload(json!({ "error": message })),
                    );
                }
                Ok(())
            }
            (_, action) => {
                debug!(proposal_id = %proposal.id, action = action.as_str(), "No task action taken");
                Ok(())
            }
        }
    }

    /// Move a gated task back to `queued`, optionally patching it first.
    async fn release_gate(
        &self,
        task_id: &TaskId,
        proposal: &ConsensusProposal,
        modifications: Option<swarm_domain::TaskModifications>,
    ) -> Result<(), OrchestrationError> {
        let task = self
            .store
            .update_task(
                task_id,
                Box::new(move |t| {
                    if t.status.is_terminal() {
                        return;
                    }
                    if let Some(modifications) = &modifications {
                        modifications.apply_to(t);
                    }
                    if t.status == TaskStatus::AwaitingConsensus {
                        t.status = TaskStatus::Queued;
                    }
                }),
            )
            .await?;

        if task.status == TaskStatus::Queued {
            info!(task_id = %task_id, proposal_id = %proposal.id, "Task approved");
            self.bus.publish(
                SwarmEvent::new(Topic::TaskApproved)
                    .with_swarm(&task.swarm_id)
                    .with_task(task_id)
                    .with_proposal(&proposal.id),
            );
        }
        Ok(())
    }
}

fn stored_outcome(proposal: &ConsensusProposal) -> ConsensusOutcome {
    match &proposal.result {
        Some(result) if result.achieved => ConsensusOutcome::Achieved(result.clone()),
        Some(result) => ConsensusOutcome::Failed(result.clone()),
        None => ConsensusOutcome::Pending {
            ratio: 0.0,
            participation_rate: 0.0,
        },
    }
}
