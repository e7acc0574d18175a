//! Swarm Coordinator
//!
//! The facade callers talk to. It wires the use cases together, owns the
//! bounded pool of executing tasks, gates tasks that require consensus,
//! and starts and stops the background processes.
//!
//! ```text
//! submit_task ──► [consensus gate] ──► pool permit ──► plan ──► supervise
//! ```

use crate::config::{ConsensusParams, SwarmConfig};
use crate::ports::analysis::AnalysisService;
use crate::ports::message_bus::MessageBus;
use crate::ports::progress::{NoProgress, ProgressNotifier};
use crate::ports::store::SwarmStore;
use crate::use_cases::agent_assignment::{AgentRegistry, AssignmentQueue};
use crate::use_cases::background::{BackgroundComponents, BackgroundProcesses};
use crate::use_cases::consensus_engine::{ConsensusEngine, ProposalSnapshot};
use crate::use_cases::errors::{ConsensusError, OrchestrationError};
use crate::use_cases::plan_execution::ExecutionPlanner;
use crate::use_cases::rebalance::Rebalancer;
use crate::use_cases::supervise_task::{ExecutionSnapshot, TaskSupervisor};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use swarm_domain::{
    AgentId, AgentRecord, ConsensusOutcome, ConsensusProposal, ConsensusVote, ProposalId,
    RebalanceSuggestion, SwarmEvent, Task, TaskId, TaskStatus, Topic, VotingRecommendation,
};
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct SwarmCoordinator {
    store: Arc<dyn SwarmStore>,
    bus: Arc<dyn MessageBus>,
    config: SwarmConfig,
    registry: Arc<AgentRegistry>,
    queue: Arc<AssignmentQueue>,
    supervisor: Arc<TaskSupervisor>,
    rebalancer: Arc<Rebalancer>,
    consensus: Arc<ConsensusEngine>,
    runner: TaskRunner,
    background: Mutex<Option<BackgroundProcesses>>,
}

impl SwarmCoordinator {
    pub fn new(
        store: Arc<dyn SwarmStore>,
        bus: Arc<dyn MessageBus>,
        analysis: Arc<dyn AnalysisService>,
        config: SwarmConfig,
    ) -> Self {
        let params = config.orchestration.clone();
        let registry = Arc::new(AgentRegistry::new(Arc::clone(&store), Arc::clone(&bus)));
        let queue = Arc::new(AssignmentQueue::new());
        let supervisor = Arc::new(TaskSupervisor::new(
            Arc::clone(&store),
            Arc::clone(&bus),
            Arc::clone(&registry),
            Arc::clone(&queue),
            params.clone(),
        ));
        let rebalancer = Arc::new(Rebalancer::new(
            Arc::clone(&store),
            Arc::clone(&bus),
            Arc::clone(&analysis),
            Arc::clone(&registry),
            Arc::clone(&queue),
            params.clone(),
        ));
        let consensus = Arc::new(
            ConsensusEngine::new(
                Arc::clone(&store),
                Arc::clone(&bus),
                Arc::clone(&analysis),
                config.consensus.clone(),
            )
            .with_analysis_timeout(params.analysis_timeout)
            .with_supervisor(Arc::clone(&supervisor)),
        );
        let runner = TaskRunner {
            store: Arc::clone(&store),
            bus: Arc::clone(&bus),
            planner: Arc::new(ExecutionPlanner::new(analysis, params.clone())),
            supervisor: Arc::clone(&supervisor),
            consensus: Arc::clone(&consensus),
            consensus_params: config.consensus.clone(),
            pool: Arc::new(Semaphore::new(params.max_concurrent_tasks.max(1))),
            progress: Arc::new(NoProgress),
            shutdown: CancellationToken::new(),
        };

        Self {
            store,
            bus,
            config,
            registry,
            queue,
            supervisor,
            rebalancer,
            consensus,
            runner,
            background: Mutex::new(None),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressNotifier>) -> Self {
        self.runner.progress = progress;
        self
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn SwarmStore> {
        Arc::clone(&self.store)
    }

    pub fn bus(&self) -> Arc<dyn MessageBus> {
        Arc::clone(&self.bus)
    }

    pub fn consensus(&self) -> Arc<ConsensusEngine> {
        Arc::clone(&self.consensus)
    }

    pub fn registry(&self) -> Arc<AgentRegistry> {
        Arc::clone(&self.registry)
    }

    /// Make an agent known to the swarm
    pub async fn register_agent(&self, agent: AgentRecord) -> Result<(), OrchestrationError> {
        self.store.save_agent(&agent).await?;
        debug!(agent_id = %agent.id, agent_type = %agent.agent_type, "Agent registered");
        Ok(())
    }

    // ==================== Tasks ====================

    /// Accept a task and start it in the background.
    ///
    /// Every dependency must already be `completed`; otherwise nothing is
    /// stored and [`OrchestrationError::DependenciesNotMet`] is returned.
    pub async fn submit_task(&self, task: Task) -> Result<TaskId, OrchestrationError> {
        let mut pending = Vec::new();
        for dependency in &task.dependencies {
            let done = self
                .store
                .get_task(dependency)
                .await?
                .is_some_and(|t| t.status == TaskStatus::Completed);
            if !done {
                pending.push(dependency.clone());
            }
        }
        if !pending.is_empty() {
            return Err(OrchestrationError::DependenciesNotMet {
                task_id: task.id.clone(),
                pending,
            });
        }

        let mut task = task;
        task.status = TaskStatus::Queued;
        self.store.save_task(&task).await?;
        self.bus.publish(
            SwarmEvent::new(Topic::TaskSubmitted)
                .with_swarm(&task.swarm_id)
                .with_task(&task.id)
                .with_payload(json!({
                    "priority": task.priority.as_str(),
                    "strategy": task.strategy.as_str(),
                    "requires_consensus": task.requires_consensus,
                })),
        );
        info!(task_id = %task.id, strategy = %task.strategy, "Task submitted");

        let task_id = task.id.clone();
        let runner = self.runner.clone();
        tokio::spawn(async move { runner.run(task).await });
        Ok(task_id)
    }

    pub async fn cancel_task(
        &self,
        task_id: &TaskId,
        reason: Option<String>,
    ) -> Result<(), OrchestrationError> {
        self.supervisor.cancel(task_id, reason).await
    }

    pub async fn task_status(&self, task_id: &TaskId) -> Result<Task, OrchestrationError> {
        self.store
            .get_task(task_id)
            .await?
            .ok_or_else(|| OrchestrationError::TaskNotFound(task_id.clone()))
    }

    pub async fn active_executions(&self) -> Vec<ExecutionSnapshot> {
        self.supervisor.active_executions().await
    }

    /// Wait until the task is terminal or `timeout` elapses, then return its
    /// latest state.
    pub async fn wait_for_task(
        &self,
        task_id: &TaskId,
        timeout: Duration,
    ) -> Result<Task, OrchestrationError> {
        let mut events = self.bus.subscribe(&[
            Topic::TaskCompleted,
            Topic::TaskFailed,
            Topic::TaskCancelled,
        ]);
        let deadline = tokio::time::Instant::now() + timeout;
        let mut poll = tokio::time::interval(self.config.orchestration.completion_poll_interval);

        loop {
            let task = self.task_status(task_id).await?;
            if task.status.is_terminal() {
                return Ok(task);
            }
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    return self.task_status(task_id).await;
                }
                event = events.recv() => {
                    if event.is_none() {
                        poll.tick().await;
                    }
                }
                _ = poll.tick() => {}
            }
        }
    }

    pub async fn rebalance(&self) -> Result<Vec<RebalanceSuggestion>, OrchestrationError> {
        self.rebalancer.rebalance().await
    }

    // ==================== Consensus ====================

    pub async fn create_proposal(
        &self,
        proposal: ConsensusProposal,
    ) -> Result<ConsensusProposal, ConsensusError> {
        self.consensus.create_proposal(proposal).await
    }

    pub async fn submit_vote(&self, vote: ConsensusVote) -> Result<ConsensusOutcome, ConsensusError> {
        self.consensus.submit_vote(vote).await
    }

    pub async fn get_proposal_status(
        &self,
        proposal_id: &ProposalId,
    ) -> Result<ProposalSnapshot, ConsensusError> {
        self.consensus.get_proposal_status(proposal_id).await
    }

    pub async fn get_voting_recommendation(
        &self,
        proposal_id: &ProposalId,
        agent_id: &AgentId,
    ) -> Result<VotingRecommendation, ConsensusError> {
        self.consensus
            .get_voting_recommendation(proposal_id, agent_id)
            .await
    }

    // ==================== Lifecycle ====================

    /// Start the background loops. A second call is a no-op.
    pub async fn start_background(&self) {
        let mut background = self.background.lock().await;
        if background.is_some() {
            return;
        }
        if let Err(e) = self.consensus.load_metrics().await {
            warn!("Could not load consensus metrics: {}", e);
        }
        *background = Some(BackgroundProcesses::start(
            BackgroundComponents {
                registry: Arc::clone(&self.registry),
                queue: Arc::clone(&self.queue),
                supervisor: Arc::clone(&self.supervisor),
                rebalancer: Arc::clone(&self.rebalancer),
                consensus: Arc::clone(&self.consensus),
            },
            &self.config.intervals,
        ));
    }

    /// Stop background work, cancel every running execution and refuse new
    /// work. Agents of cancelled tasks are notified on a best-effort basis.
    pub async fn shutdown(&self) {
        if let Some(background) = self.background.lock().await.take() {
            background.shutdown().await;
        }
        self.runner.shutdown.cancel();
        self.runner.pool.close();
        self.consensus.shutdown();

        let cancelled = self.supervisor.cancel_all("coordinator shutting down").await;
        if let Err(e) = self.consensus.persist_metrics().await {
            warn!("Could not persist consensus metrics: {}", e);
        }
        info!(cancelled = cancelled.len(), "Swarm coordinator shut down");
    }
}

/// Everything a spawned task run needs, cheap to clone
#[derive(Clone)]
struct TaskRunner {
    store: Arc<dyn SwarmStore>,
    bus: Arc<dyn MessageBus>,
    planner: Arc<ExecutionPlanner>,
    supervisor: Arc<TaskSupervisor>,
    consensus: Arc<ConsensusEngine>,
    consensus_params: ConsensusParams,
    pool: Arc<Semaphore>,
    progress: Arc<dyn ProgressNotifier>,
    shutdown: CancellationToken,
}

impl TaskRunner {
    async fn run(&self, task: Task) {
        if task.requires_consensus && !self.pass_gate(&task).await {
            return;
        }

        let _permit = tokio::select! {
            _ = self.shutdown.cancelled() => return,
            permit = Arc::clone(&self.pool).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return,
            },
        };

        // The gate or a cancellation may have changed the task meanwhile
        let task = match self.store.get_task(&task.id).await {
            Ok(Some(task)) if task.status == TaskStatus::Queued => task,
            Ok(Some(task)) => {
                debug!(task_id = %task.id, status = %task.status, "Task no longer queued");
                return;
            }
            Ok(None) => return,
            Err(e) => {
                self.fail_before_start(&task, OrchestrationError::Store(e)).await;
                return;
            }
        };

        let plan = match self.planner.plan(&task).await {
            Ok(plan) => plan,
            Err(e) => {
                self.fail_before_start(&task, OrchestrationError::InvalidPlan(e))
                    .await;
                return;
            }
        };

        let cancel = match self.supervisor.begin(&task.id).await {
            Ok(token) => token,
            Err(e @ OrchestrationError::Store(_)) => {
                self.fail_before_start(&task, e).await;
                return;
            }
            Err(e) => {
                debug!(task_id = %task.id, "Execution not started: {}", e);
                return;
            }
        };

        self.supervisor
            .run(task, plan, cancel, Arc::clone(&self.progress))
            .await;
    }

    /// Hold the task until a proposal approving it resolves. Returns whether
    /// the task may run.
    async fn pass_gate(&self, task: &Task) -> bool {
        let mut events = self
            .bus
            .subscribe(&[Topic::ConsensusAchieved, Topic::ConsensusFailed]);

        let gated = self
            .store
            .update_task(
                &task.id,
                Box::new(|t| {
                    if t.status == TaskStatus::Queued {
                        t.status = TaskStatus::AwaitingConsensus;
                    }
                }),
            )
            .await;
        if let Err(e) = gated {
            self.fail_before_start(task, e.into()).await;
            return false;
        }

        let proposal = match self.consensus.draft(
            task.swarm_id.clone(),
            json!({
                "action": "approve_task",
                "task_id": task.id,
                "description": task.description,
            }),
            None,
        ) {
            Ok(draft) => {
                let draft = draft.with_task(task.id.clone());
                match self.consensus_params.gate_deadline_ms {
                    Some(ms) => draft.with_deadline(Utc::now() + chrono::Duration::milliseconds(ms as i64)),
                    None => draft,
                }
            }
            Err(e) => {
                self.fail_before_start(task, OrchestrationError::OrchestrationToolError(e.to_string()))
                    .await;
                return false;
            }
        };

        let proposal = match self.consensus.create_proposal(proposal).await {
            Ok(proposal) => proposal,
            Err(e) => {
                self.fail_before_start(task, OrchestrationError::OrchestrationToolError(e.to_string()))
                    .await;
                return false;
            }
        };
        info!(task_id = %task.id, proposal_id = %proposal.id, "Task awaiting consensus");

        loop {
            let event = tokio::select! {
                _ = self.shutdown.cancelled() => return false,
                event = events.recv() => event,
            };
            let Some(event) = event else {
                return false;
            };
            if event.proposal_id.as_ref() != Some(&proposal.id) {
                continue;
            }
            return event.topic == Topic::ConsensusAchieved;
        }
    }

    /// Record a failure that happened before the execution began.
    async fn fail_before_start(&self, task: &Task, cause: OrchestrationError) {
        let message = cause.to_string();
        error!(task_id = %task.id, "Task could not start: {}", message);
        self.bus.publish(
            SwarmEvent::new(Topic::OrchestrationError)
                .with_swarm(&task.swarm_id)
                .with_task(&task.id)
                .with_payload(json!({ "error": message })),
        );

        let recorded = message.clone();
        match self
            .store
            .update_task(
                &task.id,
                Box::new(move |t| {
                    if !t.status.is_terminal() {
                        t.mark_failed(recorded);
                    }
                }),
            )
            .await
        {
            Ok(t) if t.status == TaskStatus::Failed => {
                self.bus.publish(
                    SwarmEvent::new(Topic::TaskFailed)
                        .with_swarm(&task.swarm_id)
                        .with_task(&task.id)
                        .with_payload(json!({ "error": message })),
                );
            }
            Ok(_) => {}
            Err(e) => warn!(task_id = %task.id, "Failed to persist start failure: {}", e),
        }
    }
}
