//! Supervise Task use case
//!
//! Owns the life cycle of each executing task: the in-memory [`Execution`],
//! phase ordering (sequential or batched parallel), checkpoint evaluation,
//! retries after agent timeouts, and the final write-back.
//!
//! ```text
//! queued ──► executing ──► completed
//!                │
//!                ├───────► failed      (AgentTimeout after retries, CheckpointFailed)
//!                └───────► cancelled   (cancel_task)
//! ```

use crate::config::OrchestrationParams;
use crate::ports::message_bus::MessageBus;
use crate::ports::progress::ProgressNotifier;
use crate::ports::store::SwarmStore;
use crate::use_cases::agent_assignment::{AgentRegistry, AssignmentQueue};
use crate::use_cases::errors::OrchestrationError;
use crate::use_cases::execute_phase::PhaseExecutor;
use futures::future::join_all;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use swarm_domain::{
    ExecutionPlan, ExecutionReport, ExecutionStatus, MessageType, PhaseResult, SwarmEvent, Task,
    TaskId, TaskStatus, Topic,
};
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// In-memory state of one running task. Never persisted.
#[derive(Debug, Clone)]
pub struct Execution {
    pub task_id: TaskId,
    pub started_at: Instant,
    pub current_phase: usize,
    pub completed_phases: usize,
    pub total_phases: usize,
    pub phase_results: Vec<PhaseResult>,
    pub status: ExecutionStatus,
    pub cancel: CancellationToken,
}

impl Execution {
    fn new(task_id: TaskId) -> Self {
        Self {
            task_id,
            started_at: Instant::now(),
            current_phase: 0,
            completed_phases: 0,
            total_phases: 0,
            phase_results: Vec::new(),
            status: ExecutionStatus::Executing,
            cancel: CancellationToken::new(),
        }
    }

    /// completed / total as a percentage, 0 before planning
    pub fn progress(&self) -> f64 {
        if self.total_phases == 0 {
            0.0
        } else {
            self.completed_phases as f64 / self.total_phases as f64 * 100.0
        }
    }
}

/// Read-only view of an execution for callers
#[derive(Debug, Clone)]
pub struct ExecutionSnapshot {
    pub task_id: TaskId,
    pub status: ExecutionStatus,
    pub current_phase: usize,
    pub completed_phases: usize,
    pub total_phases: usize,
    pub elapsed_ms: u64,
}

pub struct TaskSupervisor {
    store: Arc<dyn SwarmStore>,
    bus: Arc<dyn MessageBus>,
    registry: Arc<AgentRegistry>,
    queue: Arc<AssignmentQueue>,
    executor: Arc<PhaseExecutor>,
    params: OrchestrationParams,
    executions: RwLock<HashMap<TaskId, Execution>>,
}

impl TaskSupervisor {
    pub fn new(
        store: Arc<dyn SwarmStore>,
        bus: Arc<dyn MessageBus>,
        registry: Arc<AgentRegistry>,
        queue: Arc<AssignmentQueue>,
        params: OrchestrationParams,
    ) -> Self {
        let executor = Arc::new(PhaseExecutor::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            Arc::clone(&queue),
            params.clone(),
        ));
        Self {
            store,
            bus,
            registry,
            queue,
            executor,
            params,
            executions: RwLock::new(HashMap::new()),
        }
    }

    /// Register the execution of a task and mark it `executing`.
    ///
    /// Fails with [`OrchestrationError::AlreadyActive`] when the task already
    /// has an execution. The returned token is cancelled by
    /// [`cancel`](Self::cancel).
    pub async fn begin(&self, task_id: &TaskId) -> Result<CancellationToken, OrchestrationError> {
        let execution = Execution::new(task_id.clone());
        let token = execution.cancel.clone();
        {
            let mut executions = self.executions.write().await;
            if executions.contains_key(task_id) {
                return Err(OrchestrationError::AlreadyActive(task_id.clone()));
            }
            executions.insert(task_id.clone(), execution);
        }

        let started = self
            .store
            .update_task(
                task_id,
                Box::new(|task| {
                    if !task.status.is_terminal() {
                        task.mark_executing();
                    }
                }),
            )
            .await;

        match started {
            Ok(task) if task.status == TaskStatus::Executing => {
                info!(task_id = %task_id, "Task execution started");
                Ok(token)
            }
            Ok(task) => {
                self.executions.write().await.remove(task_id);
                debug!(task_id = %task_id, status = %task.status, "Task no longer runnable");
                Err(OrchestrationError::TaskNotActive(task_id.clone()))
            }
            Err(e) => {
                self.executions.write().await.remove(task_id);
                Err(e.into())
            }
        }
    }

    /// Execute a planned task to a terminal state and write the outcome back.
    ///
    /// Must follow a successful [`begin`](Self::begin). Returns the status
    /// the task ended in.
    pub async fn run(
        &self,
        task: Task,
        plan: ExecutionPlan,
        cancel: CancellationToken,
        progress: Arc<dyn ProgressNotifier>,
    ) -> TaskStatus {
        self.update_execution(&task.id, |e| e.total_phases = plan.phase_count())
            .await;

        let outcome = self.run_phases(&task, &plan, &cancel, &progress).await;
        let status = match outcome {
            Ok(phase_results) => self.complete(&task, phase_results).await,
            Err(e) if e.is_cancellation() => {
                debug!(task_id = %task.id, "Execution stopped by cancellation");
                TaskStatus::Cancelled
            }
            Err(e) => self.fail(&task, &e).await,
        };

        self.registry.forget_task(&task.id);
        progress.on_task_finished(&task.id, status);
        status
    }

    async fn run_phases(
        &self,
        task: &Task,
        plan: &ExecutionPlan,
        cancel: &CancellationToken,
        progress: &Arc<dyn ProgressNotifier>,
    ) -> Result<Vec<PhaseResult>, OrchestrationError> {
        let mut phase_results = Vec::with_capacity(plan.phase_count());

        for batch in plan.batches() {
            if cancel.is_cancelled() {
                return Err(OrchestrationError::Cancelled);
            }
            if let Some(first) = batch.first() {
                self.update_execution(&task.id, |e| e.current_phase = *first)
                    .await;
            }

            let results = if batch.len() == 1 {
                vec![self.run_phase_with_retry(task, plan, batch[0], cancel, progress).await]
            } else {
                self.run_batch(task, plan, &batch, cancel, progress).await
            };

            // Checkpoints in plan order, after the whole batch is in
            for (index, result) in batch.iter().copied().zip(results) {
                let phase_result = result?;
                let Some(phase) = plan.phase(index) else {
                    continue;
                };
                let evaluation = phase.checkpoint.evaluate(phase_result.success_rate());
                progress.on_phase_complete(&task.id, phase.kind, evaluation.score, evaluation.passed);

                if !evaluation.passed {
                    warn!(
                        task_id = %task.id,
                        phase = %phase.kind,
                        score = evaluation.score,
                        threshold = phase.checkpoint.failure_threshold,
                        "Checkpoint failed"
                    );
                    return Err(OrchestrationError::CheckpointFailed {
                        phase: phase.kind,
                        score: evaluation.score,
                    });
                }

                self.bus.publish(
                    SwarmEvent::new(Topic::PhaseCompleted)
                        .with_swarm(&task.swarm_id)
                        .with_task(&task.id)
                        .with_payload(json!({
                            "phase": phase.kind.as_str(),
                            "phase_index": index,
                            "success_rate": phase_result.success_rate(),
                        })),
                );
                self.bus.publish(
                    SwarmEvent::new(Topic::CheckpointPassed)
                        .with_swarm(&task.swarm_id)
                        .with_task(&task.id)
                        .with_payload(json!({
                            "phase": phase.kind.as_str(),
                            "score": evaluation.score,
                            "required_progress": phase.checkpoint.required_progress,
                        })),
                );

                let recorded = phase_result.clone();
                self.update_execution(&task.id, move |e| {
                    e.completed_phases += 1;
                    e.phase_results.push(recorded);
                })
                .await;
                phase_results.push(phase_result);
            }
        }

        Ok(phase_results)
    }

    /// Run a batch of parallel phases concurrently; results in batch order.
    async fn run_batch(
        &self,
        task: &Task,
        plan: &ExecutionPlan,
        batch: &[usize],
        cancel: &CancellationToken,
        progress: &Arc<dyn ProgressNotifier>,
    ) -> Vec<Result<PhaseResult, OrchestrationError>> {
        debug!(task_id = %task.id, phases = ?batch, "Running parallel batch");
        let mut join_set = JoinSet::new();

        for &index in batch {
            let Some(phase) = plan.phase(index).cloned() else {
                continue;
            };
            let executor = Arc::clone(&self.executor);
            let task = task.clone();
            let cancel = cancel.clone();
            let progress = Arc::clone(progress);
            let retries = self.params.retry_budget;

            join_set.spawn(async move {
                let result = retry_phase(retries, &task, index, || {
                    executor.execute(&task, index, &phase, &cancel, progress.as_ref())
                })
                .await;
                (index, result)
            });
        }

        let mut collected: Vec<(usize, Result<PhaseResult, OrchestrationError>)> = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(entry) => collected.push(entry),
                Err(e) => {
                    error!(task_id = %task.id, "Phase task join error: {}", e);
                }
            }
        }

        batch
            .iter()
            .map(|index| {
                collected
                    .iter()
                    .position(|(i, _)| i == index)
                    .map(|pos| collected.swap_remove(pos).1)
                    .unwrap_or_else(|| {
                        Err(OrchestrationError::OrchestrationToolError(format!(
                            "phase {} did not report a result",
                            index
                        )))
                    })
            })
            .collect()
    }

    async fn run_phase_with_retry(
        &self,
        task: &Task,
        plan: &ExecutionPlan,
        index: usize,
        cancel: &CancellationToken,
        progress: &Arc<dyn ProgressNotifier>,
    ) -> Result<PhaseResult, OrchestrationError> {
        let phase = plan.phase(index).ok_or_else(|| {
            OrchestrationError::OrchestrationToolError(format!("plan has no phase {}", index))
        })?;
        retry_phase(self.params.retry_budget, task, index, || {
            self.executor
                .execute(task, index, phase, cancel, progress.as_ref())
        })
        .await
    }

    async fn complete(&self, task: &Task, phase_results: Vec<PhaseResult>) -> TaskStatus {
        let duration_ms = self
            .remove_execution(&task.id)
            .await
            .map(|e| e.started_at.elapsed().as_millis() as u64)
            .unwrap_or_default();
        let report = ExecutionReport::new(task.id.clone(), duration_ms, phase_results);
        let summary = json!({
            "successful_phases": report.summary.successful_phases,
            "total_phases": report.summary.total_phases,
        });
        let result = match serde_json::to_value(&report) {
            Ok(value) => value,
            Err(e) => {
                warn!(task_id = %task.id, "Failed to serialize execution report: {}", e);
                summary.clone()
            }
        };

        let written = self
            .store
            .update_task(
                &task.id,
                Box::new(move |t| {
                    if !t.status.is_terminal() {
                        t.mark_completed(result);
                    }
                }),
            )
            .await;

        match written {
            Ok(t) if t.status == TaskStatus::Completed => {
                info!(task_id = %task.id, duration_ms, "Task completed");
                self.bus.publish(
                    SwarmEvent::new(Topic::TaskCompleted)
                        .with_swarm(&task.swarm_id)
                        .with_task(&task.id)
                        .with_payload(summary),
                );
                TaskStatus::Completed
            }
            Ok(t) => t.status,
            Err(e) => {
                error!(task_id = %task.id, "Failed to persist task completion: {}", e);
                TaskStatus::Failed
            }
        }
    }

    async fn fail(&self, task: &Task, cause: &OrchestrationError) -> TaskStatus {
        self.remove_execution(&task.id).await;
        let message = cause.to_string();
        error!(task_id = %task.id, "Task failed: {}", message);

        let recorded = message.clone();
        let written = self
            .store
            .update_task(
                &task.id,
                Box::new(move |t| {
                    if !t.status.is_terminal() {
                        t.mark_failed(recorded);
                    }
                }),
            )
            .await;
        if let Err(e) = &written {
            error!(task_id = %task.id, "Failed to persist task failure: {}", e);
        }

        self.bus.publish(
            SwarmEvent::new(Topic::TaskFailed)
                .with_swarm(&task.swarm_id)
                .with_task(&task.id)
                .with_payload(json!({ "error": message })),
        );
        written.map(|t| t.status).unwrap_or(TaskStatus::Failed)
    }

    /// Cancel a task that has not reached a terminal state.
    ///
    /// A running execution is stopped (its waits end immediately), every
    /// agent still holding the task is told and released, queued
    /// assignments are dropped and the task is persisted as `cancelled`.
    pub async fn cancel(
        &self,
        task_id: &TaskId,
        reason: Option<String>,
    ) -> Result<(), OrchestrationError> {
        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| OrchestrationError::TaskNotActive(task_id.clone()))?;
        if task.status.is_terminal() {
            return Err(OrchestrationError::TaskNotActive(task_id.clone()));
        }

        if let Some(mut execution) = self.remove_execution(task_id).await {
            execution.status = ExecutionStatus::Cancelled;
            execution.cancel.cancel();
            debug!(task_id = %task_id, completed_phases = execution.completed_phases, "Execution cancelled");
        }
        let dropped = self.queue.discard_task(task_id);
        if dropped > 0 {
            debug!(task_id = %task_id, dropped, "Queued assignments discarded");
        }

        self.release_holders(&task).await;
        self.registry.forget_task(task_id);

        let recorded = reason.clone();
        self.store
            .update_task(
                task_id,
                Box::new(move |t| {
                    if !t.status.is_terminal() {
                        t.mark_cancelled(recorded);
                    }
                }),
            )
            .await?;

        info!(task_id = %task_id, "Task cancelled");
        self.bus.publish(
            SwarmEvent::new(Topic::TaskCancelled)
                .with_swarm(&task.swarm_id)
                .with_task(task_id)
                .with_payload(json!({ "reason": reason })),
        );
        Ok(())
    }

    /// Tell every agent holding the task to stop and release it (best effort).
    async fn release_holders(&self, task: &Task) {
        let holders = match self.store.list_agents(Some(&task.swarm_id)).await {
            Ok(agents) => agents
                .into_iter()
                .filter(|a| a.holds(&task.id))
                .collect::<Vec<_>>(),
            Err(e) => {
                warn!(task_id = %task.id, "Could not list agents to notify: {}", e);
                return;
            }
        };

        join_all(holders.iter().map(|agent| async move {
            self.registry
                .notify_agent(
                    &task.swarm_id,
                    &agent.id,
                    MessageType::TaskCancellation,
                    json!({ "task_id": task.id }),
                )
                .await;
            if let Err(e) = self.registry.release_agent(&agent.id, &task.id).await {
                warn!(agent_id = %agent.id, "Failed to release agent: {}", e);
            }
        }))
        .await;
    }

    /// Persist `completed / total * 100` for every running execution.
    ///
    /// Returns the number of tasks updated.
    pub async fn persist_progress(&self) -> Result<usize, OrchestrationError> {
        let snapshot: Vec<(TaskId, f64)> = self
            .executions
            .read()
            .await
            .values()
            .map(|e| (e.task_id.clone(), e.progress()))
            .collect();

        for (task_id, progress) in &snapshot {
            let progress = *progress;
            self.store
                .update_task(
                    task_id,
                    Box::new(move |t| {
                        if t.status == TaskStatus::Executing {
                            t.progress = progress;
                        }
                    }),
                )
                .await?;
        }
        Ok(snapshot.len())
    }

    pub async fn is_active(&self, task_id: &TaskId) -> bool {
        self.executions.read().await.contains_key(task_id)
    }

    pub async fn active_executions(&self) -> Vec<ExecutionSnapshot> {
        let mut snapshots: Vec<ExecutionSnapshot> = self
            .executions
            .read()
            .await
            .values()
            .map(|e| ExecutionSnapshot {
                task_id: e.task_id.clone(),
                status: e.status,
                current_phase: e.current_phase,
                completed_phases: e.completed_phases,
                total_phases: e.total_phases,
                elapsed_ms: e.started_at.elapsed().as_millis() as u64,
            })
            .collect();
        snapshots.sort_by(|a, b| a.task_id.as_str().cmp(b.task_id.as_str()));
        snapshots
    }

    /// Cancel every running execution. Returns the cancelled task ids.
    pub async fn cancel_all(&self, reason: &str) -> Vec<TaskId> {
        let running: Vec<TaskId> = self.executions.read().await.keys().cloned().collect();
        let mut cancelled = Vec::with_capacity(running.len());
        for task_id in running {
            match self.cancel(&task_id, Some(reason.to_string())).await {
                Ok(()) => cancelled.push(task_id),
                Err(e) => warn!(task_id = %task_id, "Failed to cancel during shutdown: {}", e),
            }
        }
        cancelled
    }

    async fn update_execution(&self, task_id: &TaskId, update: impl FnOnce(&mut Execution)) {
        if let Some(execution) = self.executions.write().await.get_mut(task_id) {
            update(execution);
        }
    }

    async fn remove_execution(&self, task_id: &TaskId) -> Option<Execution> {
        self.executions.write().await.remove(task_id)
    }
}

/// Run a phase, re-running it after agent timeouts while `retries` remain.
async fn retry_phase<F, Fut>(
    retries: u32,
    task: &Task,
    index: usize,
    mut attempt: F,
) -> Result<PhaseResult, OrchestrationError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<PhaseResult, OrchestrationError>>,
{
    let mut remaining = retries;
    loop {
        match attempt().await {
            Err(e) if e.is_retryable() && remaining > 0 => {
                remaining -= 1;
                warn!(
                    task_id = %task.id,
                    phase_index = index,
                    retries_left = remaining,
                    "Retrying phase after: {}",
                    e
                );
            }
            other => return other,
        }
    }
}
