//! Execution plan entities

use super::checkpoint::Checkpoint;
use super::estimate::ComplexityEstimate;
use super::phase::{AgentRole, PhaseKind};
use super::strategy::StrategyKind;
use crate::agent::entities::Capabilities;
use crate::core::ids::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One unit of agent work inside a phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub role: AgentRole,
    /// Capabilities an agent needs to take this assignment
    pub required_capabilities: Capabilities,
    pub responsibilities: Vec<String>,
    pub expected_output: String,
    pub timeout_ms: u64,
    /// May run concurrently with sibling assignments of the same phase
    pub parallel: bool,
}

impl TaskAssignment {
    /// Build the assignment template for a phase kind.
    pub fn for_phase(kind: PhaseKind, task_capabilities: &Capabilities, timeout: Duration) -> Self {
        let role = kind.role();
        let mut required_capabilities = task_capabilities.clone();
        required_capabilities.insert(role.capability().to_string());

        Self {
            role,
            required_capabilities,
            responsibilities: kind
                .responsibilities()
                .iter()
                .map(|r| r.to_string())
                .collect(),
            expected_output: kind.expected_output().to_string(),
            timeout_ms: timeout.as_millis() as u64,
            parallel: kind.is_parallel_capable(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }
}

/// A phase with its assignments and quality gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedPhase {
    pub kind: PhaseKind,
    pub assignments: Vec<TaskAssignment>,
    pub checkpoint: Checkpoint,
}

impl PlannedPhase {
    /// Whether every assignment of this phase may run in parallel
    pub fn is_parallel(&self) -> bool {
        !self.assignments.is_empty() && self.assignments.iter().all(|a| a.parallel)
    }
}

/// The phase breakdown of a single task
///
/// Immutable once built; the supervisor owns it for the lifetime of the
/// execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    task_id: TaskId,
    strategy: StrategyKind,
    phases: Vec<PlannedPhase>,
    parallelizable: bool,
    max_concurrency: usize,
    estimate: ComplexityEstimate,
    created_at: DateTime<Utc>,
}

impl ExecutionPlan {
    pub fn new(
        task_id: TaskId,
        strategy: StrategyKind,
        phases: Vec<PlannedPhase>,
        parallelizable: bool,
        max_concurrency: usize,
        estimate: ComplexityEstimate,
    ) -> Self {
        Self {
            task_id,
            strategy,
            phases,
            parallelizable,
            max_concurrency: max_concurrency.max(1),
            estimate,
            created_at: Utc::now(),
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    pub fn phases(&self) -> &[PlannedPhase] {
        &self.phases
    }

    pub fn phase(&self, index: usize) -> Option<&PlannedPhase> {
        self.phases.get(index)
    }

    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    pub fn phase_names(&self) -> Vec<&'static str> {
        self.phases.iter().map(|p| p.kind.as_str()).collect()
    }

    pub fn is_parallelizable(&self) -> bool {
        self.parallelizable
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn estimate(&self) -> &ComplexityEstimate {
        &self.estimate
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Group phase indices into execution batches.
    ///
    /// Sequential plans get one phase per batch. Parallelizable plans merge
    /// each run of consecutive parallel phases into one batch; phases that
    /// are not parallel still run on their own, in order.
    pub fn batches(&self) -> Vec<Vec<usize>> {
        let mut batches: Vec<Vec<usize>> = Vec::new();
        let mut open_parallel = false;

        for (index, phase) in self.phases.iter().enumerate() {
            let parallel = self.parallelizable && phase.is_parallel();
            match batches.last_mut() {
                Some(batch) if parallel && open_parallel => batch.push(index),
                _ => batches.push(vec![index]),
            }
            open_parallel = parallel;
        }

        batches
    }
}
