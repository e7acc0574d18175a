//! Execution results: per-assignment outcomes, phase aggregation and the
//! final report written back to the task record.

use crate::core::ids::{AgentId, TaskId};
use crate::plan::phase::{AgentRole, PhaseKind};
use serde::{Deserialize, Serialize};

/// Life-cycle of the in-memory execution of one task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Executing,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Executing => "executing",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }
}

/// Result of dispatching one assignment to one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentOutcome {
    pub agent_id: Option<AgentId>,
    pub role: AgentRole,
    pub success: bool,
    #[serde(default)]
    pub output: serde_json::Value,
    #[serde(default)]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl AssignmentOutcome {
    pub fn success(
        agent_id: AgentId,
        role: AgentRole,
        output: serde_json::Value,
        duration_ms: u64,
    ) -> Self {
        Self {
            agent_id: Some(agent_id),
            role,
            success: true,
            output,
            error: None,
            duration_ms,
        }
    }

    pub fn failure(
        agent_id: Option<AgentId>,
        role: AgentRole,
        error: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            agent_id,
            role,
            success: false,
            output: serde_json::Value::Null,
            error: Some(error.into()),
            duration_ms,
        }
    }
}

/// Aggregate statistics for one phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSummary {
    /// Fraction of dispatches that reported success; `None` when nothing ran
    pub success_rate: Option<f64>,
    pub total_executions: usize,
    /// Outputs of the successful dispatches, keyed by role
    pub aggregated_data: serde_json::Value,
}

/// Everything one phase produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase: PhaseKind,
    pub phase_index: usize,
    pub results: Vec<AssignmentOutcome>,
    pub summary: PhaseSummary,
}

impl PhaseResult {
    /// Fold assignment outcomes into a phase result.
    pub fn aggregate(phase: PhaseKind, phase_index: usize, results: Vec<AssignmentOutcome>) -> Self {
        let total_executions = results.len();
        let successes = results.iter().filter(|r| r.success).count();
        let success_rate = if total_executions == 0 {
            None
        } else {
            Some(successes as f64 / total_executions as f64)
        };

        let mut aggregated = serde_json::Map::new();
        for outcome in results.iter().filter(|r| r.success) {
            let entry = aggregated
                .entry(outcome.role.as_str().to_string())
                .or_insert_with(|| serde_json::Value::Array(Vec::new()));
            if let serde_json::Value::Array(items) = entry {
                items.push(outcome.output.clone());
            }
        }

        Self {
            phase,
            phase_index,
            results,
            summary: PhaseSummary {
                success_rate,
                total_executions,
                aggregated_data: serde_json::Value::Object(aggregated),
            },
        }
    }

    pub fn success_rate(&self) -> Option<f64> {
        self.summary.success_rate
    }

    /// A phase counts as successful when at least half its dispatches succeeded
    pub fn is_successful(&self) -> bool {
        self.summary.success_rate.is_none_or(|rate| rate >= 0.5)
    }
}

/// Roll-up written into the task result on completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub successful_phases: usize,
    pub total_phases: usize,
    pub success_fraction: f64,
}

/// Final result of a completed execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub task_id: TaskId,
    pub duration_ms: u64,
    pub phase_results: Vec<PhaseResult>,
    pub summary: ExecutionSummary,
}

impl ExecutionReport {
    pub fn new(task_id: TaskId, duration_ms: u64, phase_results: Vec<PhaseResult>) -> Self {
        let total_phases = phase_results.len();
        let successful_phases = phase_results.iter().filter(|p| p.is_successful()).count();
        let success_fraction = if total_phases == 0 {
            0.0
        } else {
            successful_phases as f64 / total_phases as f64
        };
        Self {
            task_id,
            duration_ms,
            phase_results,
            summary: ExecutionSummary {
                successful_phases,
                total_phases,
                success_fraction,
            },
        }
    }
}
