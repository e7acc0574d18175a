//! Bus topics

use serde::{Deserialize, Serialize};

/// Named topic a [`SwarmEvent`](super::SwarmEvent) is published under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Topic {
    TaskSubmitted,
    TaskAssigned,
    TaskCompleted,
    TaskFailed,
    TaskCancelled,
    TaskApproved,
    PhaseCompleted,
    CheckpointPassed,
    AgentReassigned,
    OrchestrationError,
    ProposalCreated,
    VoteSubmitted,
    ConsensusAchieved,
    ConsensusFailed,
}

impl Topic {
    pub const ALL: [Topic; 14] = [
        Topic::TaskSubmitted,
        Topic::TaskAssigned,
        Topic::TaskCompleted,
        Topic::TaskFailed,
        Topic::TaskCancelled,
        Topic::TaskApproved,
        Topic::PhaseCompleted,
        Topic::CheckpointPassed,
        Topic::AgentReassigned,
        Topic::OrchestrationError,
        Topic::ProposalCreated,
        Topic::VoteSubmitted,
        Topic::ConsensusAchieved,
        Topic::ConsensusFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::TaskSubmitted => "taskSubmitted",
            Topic::TaskAssigned => "taskAssigned",
            Topic::TaskCompleted => "taskCompleted",
            Topic::TaskFailed => "taskFailed",
            Topic::TaskCancelled => "taskCancelled",
            Topic::TaskApproved => "taskApproved",
            Topic::PhaseCompleted => "phaseCompleted",
            Topic::CheckpointPassed => "checkpointPassed",
            Topic::AgentReassigned => "agentReassigned",
            Topic::OrchestrationError => "orchestrationError",
            Topic::ProposalCreated => "proposalCreated",
            Topic::VoteSubmitted => "voteSubmitted",
            Topic::ConsensusAchieved => "consensusAchieved",
            Topic::ConsensusFailed => "consensusFailed",
        }
    }

    /// Terminal task topics, handy for waiting on a task
    pub fn is_task_terminal(&self) -> bool {
        matches!(
            self,
            Topic::TaskCompleted | Topic::TaskFailed | Topic::TaskCancelled
        )
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("Unknown topic: {}", s))
    }
}
