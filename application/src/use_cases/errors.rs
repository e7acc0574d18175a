//! Error types shared by the orchestration and consensus use cases.

use crate::ports::store::StoreError;
use swarm_domain::{AgentId, DomainError, PhaseKind, ProposalId, TaskId};
use thiserror::Error;

/// Errors that can end (or refuse to start) a task execution
#[derive(Error, Debug)]
pub enum OrchestrationError {
    #[error("AgentTimeout: agent {agent_id} did not finish task {task_id} in time")]
    AgentTimeout { agent_id: AgentId, task_id: TaskId },

    #[error("CheckpointFailed: phase {phase} scored {score:.2}")]
    CheckpointFailed { phase: PhaseKind, score: f64 },

    #[error("OrchestrationToolError: {0}")]
    OrchestrationToolError(String),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Task {0} is not active")]
    TaskNotActive(TaskId),

    #[error("Task {0} already has an active execution")]
    AlreadyActive(TaskId),

    #[error("Task {task_id} is waiting on unfinished dependencies: {}", pending.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", "))]
    DependenciesNotMet {
        task_id: TaskId,
        pending: Vec<TaskId>,
    },

    #[error("Invalid plan: {0}")]
    InvalidPlan(#[from] DomainError),

    #[error("Execution cancelled")]
    Cancelled,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl OrchestrationError {
    /// Only agent timeouts consume the retry budget
    pub fn is_retryable(&self) -> bool {
        matches!(self, OrchestrationError::AgentTimeout { .. })
    }

    /// Errors that end the task without writing a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, OrchestrationError::Cancelled)
    }
}

/// Errors returned synchronously by the consensus engine
#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("Proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    #[error("Invalid vote: {0}")]
    InvalidVote(String),

    #[error("Invalid proposal: {0}")]
    InvalidProposal(#[from] DomainError),

    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_timeout_message_names_agent() {
        let error = OrchestrationError::AgentTimeout {
            agent_id: AgentId::new("executor-1"),
            task_id: TaskId::new("t2"),
        };
        let message = error.to_string();
        assert!(message.contains("AgentTimeout"));
        assert!(message.contains("executor-1"));
        assert!(error.is_retryable());
    }

    #[test]
    fn test_dependencies_message() {
        let error = OrchestrationError::DependenciesNotMet {
            task_id: TaskId::new("t3"),
            pending: vec![TaskId::new("t1"), TaskId::new("t2")],
        };
        assert_eq!(
            error.to_string(),
            "Task t3 is waiting on unfinished dependencies: t1, t2"
        );
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_checkpoint_message() {
        let error = OrchestrationError::CheckpointFailed {
            phase: PhaseKind::Execution,
            score: 0.0,
        };
        assert_eq!(error.to_string(), "CheckpointFailed: phase execution scored 0.00");
    }
}
