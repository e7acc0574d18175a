//! Execute Phase use case
//!
//! Runs one planned phase: obtains an agent per assignment, dispatches the
//! work, waits for each agent to hand back a result (or time out) and
//! aggregates the outcomes into a [`PhaseResult`].

use crate::config::OrchestrationParams;
use crate::ports::progress::ProgressNotifier;
use crate::ports::store::SwarmStore;
use crate::use_cases::agent_assignment::{AgentRegistry, AssignmentQueue, Dispatch};
use crate::use_cases::errors::OrchestrationError;
use futures::future::join_all;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};
use swarm_domain::{
    AgentId, AgentResult, AssignmentOutcome, PhaseKind, PhaseResult, PlannedPhase, Task, TaskId,
    TaskAssignment,
};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Attempts to claim a freshly found agent before giving up and queueing
const CLAIM_ATTEMPTS: usize = 3;

pub struct PhaseExecutor {
    store: Arc<dyn SwarmStore>,
    registry: Arc<AgentRegistry>,
    queue: Arc<AssignmentQueue>,
    params: OrchestrationParams,
}

impl PhaseExecutor {
    pub fn new(
        store: Arc<dyn SwarmStore>,
        registry: Arc<AgentRegistry>,
        queue: Arc<AssignmentQueue>,
        params: OrchestrationParams,
    ) -> Self {
        Self {
            store,
            registry,
            queue,
            params,
        }
    }

    /// Run every assignment of `phase` and aggregate the outcomes.
    ///
    /// Parallel phases dispatch all assignments at once; others dispatch
    /// them one after another. Failures inside an assignment become failed
    /// outcomes; only [`OrchestrationError::AgentTimeout`] and
    /// [`OrchestrationError::Cancelled`] escape.
    pub async fn execute(
        &self,
        task: &Task,
        phase_index: usize,
        phase: &PlannedPhase,
        cancel: &CancellationToken,
        progress: &dyn ProgressNotifier,
    ) -> Result<PhaseResult, OrchestrationError> {
        info!(
            task_id = %task.id,
            phase = %phase.kind,
            phase_index,
            assignments = phase.assignments.len(),
            parallel = phase.is_parallel(),
            "Phase started"
        );
        progress.on_phase_start(&task.id, phase.kind, phase.assignments.len());

        let mut outcomes = Vec::with_capacity(phase.assignments.len());
        let mut escaped: Option<OrchestrationError> = None;

        if phase.is_parallel() {
            let runs = phase
                .assignments
                .iter()
                .map(|a| self.run_assignment(task, phase_index, phase.kind, a, cancel));
            for result in join_all(runs).await {
                match result {
                    Ok(outcome) => {
                        progress.on_assignment_complete(&task.id, phase.kind, outcome.role, outcome.success);
                        outcomes.push(outcome);
                    }
                    Err(e) => {
                        escaped.get_or_insert(e);
                    }
                }
            }
        } else {
            for assignment in &phase.assignments {
                let outcome = self
                    .run_assignment(task, phase_index, phase.kind, assignment, cancel)
                    .await?;
                progress.on_assignment_complete(&task.id, phase.kind, outcome.role, outcome.success);
                outcomes.push(outcome);
            }
        }

        if let Some(e) = escaped {
            return Err(e);
        }

        let result = PhaseResult::aggregate(phase.kind, phase_index, outcomes);
        debug!(
            task_id = %task.id,
            phase = %phase.kind,
            success_rate = ?result.success_rate(),
            "Phase aggregated"
        );
        Ok(result)
    }

    async fn run_assignment(
        &self,
        task: &Task,
        phase_index: usize,
        kind: PhaseKind,
        assignment: &TaskAssignment,
        cancel: &CancellationToken,
    ) -> Result<AssignmentOutcome, OrchestrationError> {
        let started = Instant::now();
        let brief = json!({
            "phase": kind.as_str(),
            "phase_index": phase_index,
            "role": assignment.role.as_str(),
            "responsibilities": assignment.responsibilities,
            "expected_output": assignment.expected_output,
            "timeout_ms": assignment.timeout_ms,
            "description": task.description,
        });

        let dispatch = match self.acquire_agent(task, kind, assignment, brief, cancel).await {
            Ok(Some(dispatch)) => dispatch,
            Ok(None) => {
                warn!(task_id = %task.id, phase = %kind, role = %assignment.role, "No agent became available");
                return Ok(AssignmentOutcome::failure(
                    None,
                    assignment.role,
                    "no agent available",
                    elapsed_ms(started),
                ));
            }
            Err(e) if e.is_cancellation() => return Err(e),
            Err(e) => {
                warn!(task_id = %task.id, phase = %kind, "Assignment failed before dispatch: {}", e);
                return Ok(AssignmentOutcome::failure(
                    None,
                    assignment.role,
                    e.to_string(),
                    elapsed_ms(started),
                ));
            }
        };

        let waited = self
            .await_completion(&task.id, dispatch, assignment.timeout(), cancel)
            .await;

        let (agent_id, result) = match waited {
            Ok(done) => done,
            Err(e @ (OrchestrationError::AgentTimeout { .. } | OrchestrationError::Cancelled)) => {
                return Err(e);
            }
            Err(e) => {
                warn!(task_id = %task.id, phase = %kind, "Lost track of agent: {}", e);
                return Ok(AssignmentOutcome::failure(
                    None,
                    assignment.role,
                    e.to_string(),
                    elapsed_ms(started),
                ));
            }
        };

        self.record_performance(&agent_id, result.success).await;
        let duration_ms = elapsed_ms(started);
        Ok(if result.success {
            AssignmentOutcome::success(agent_id, assignment.role, result.output, duration_ms)
        } else {
            AssignmentOutcome::failure(
                Some(agent_id),
                assignment.role,
                result.error.unwrap_or_else(|| "agent reported failure".to_string()),
                duration_ms,
            )
        })
    }

    /// Claim an idle agent, or queue the assignment and wait for the
    /// distributor. `Ok(None)` when nothing turned up within the timeout.
    async fn acquire_agent(
        &self,
        task: &Task,
        kind: PhaseKind,
        assignment: &TaskAssignment,
        brief: Value,
        cancel: &CancellationToken,
    ) -> Result<Option<Dispatch>, OrchestrationError> {
        for _ in 0..CLAIM_ATTEMPTS {
            let Some(agent) = self
                .registry
                .find_suitable_agent(Some(&task.swarm_id), &assignment.required_capabilities)
                .await?
            else {
                break;
            };
            if let Some(dispatch) = self
                .registry
                .assign_task_to_agent(&task.id, &agent.id, brief.clone())
                .await?
            {
                return Ok(Some(dispatch));
            }
        }

        let placed = self.queue.enqueue(
            task.id.clone(),
            task.swarm_id.clone(),
            task.priority,
            kind,
            assignment.required_capabilities.clone(),
            brief,
        );
        tokio::select! {
            _ = cancel.cancelled() => Err(OrchestrationError::Cancelled),
            _ = tokio::time::sleep(assignment.timeout()) => Ok(None),
            dispatch = placed => Ok(dispatch.ok()),
        }
    }

    /// Poll the agent until it hands back a result for this task.
    ///
    /// A result counts only when it answers this very claim. Once the agent
    /// has moved past the claim without such a result the wait follows a
    /// recorded handoff, or reports a failed result.
    async fn await_completion(
        &self,
        task_id: &TaskId,
        dispatch: Dispatch,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<(AgentId, AgentResult), OrchestrationError> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut current = dispatch;
        let mut ticker = tokio::time::interval(self.params.completion_poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(OrchestrationError::Cancelled),
                _ = tokio::time::sleep_until(deadline) => {
                    let agent_id = current.agent_id;
                    warn!(agent_id = %agent_id, task_id = %task_id, "Agent timed out");
                    if let Err(e) = self.registry.release_agent(&agent_id, task_id).await {
                        warn!(agent_id = %agent_id, "Failed to release timed out agent: {}", e);
                    }
                    self.record_performance(&agent_id, false).await;
                    return Err(OrchestrationError::AgentTimeout {
                        agent_id,
                        task_id: task_id.clone(),
                    });
                }
                _ = ticker.tick() => {
                    let Some(agent) = self.store.get_agent(&current.agent_id).await? else {
                        return Ok((
                            current.agent_id,
                            AgentResult::failure(task_id.clone(), "agent disappeared"),
                        ));
                    };
                    if let Some(result) = &agent.last_result
                        && &result.task_id == task_id
                        && result.dispatch == current.number
                    {
                        return Ok((current.agent_id, result.clone()));
                    }
                    let still_held = agent.holds(task_id) && agent.dispatch() == current.number;
                    if !still_held {
                        if let Some(next) = self.registry.take_handoff(task_id, &current) {
                            debug!(
                                from = %current.agent_id,
                                to = %next.agent_id,
                                task_id = %task_id,
                                "Following reassignment"
                            );
                            current = next;
                            continue;
                        }
                        return Ok((
                            current.agent_id,
                            AgentResult::failure(
                                task_id.clone(),
                                "agent released the task without a result",
                            ),
                        ));
                    }
                }
            }
        }
    }

    async fn record_performance(&self, agent_id: &AgentId, success: bool) {
        if let Err(e) = self.store.record_performance(agent_id, success).await {
            warn!(agent_id = %agent_id, "Failed to record performance: {}", e);
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
