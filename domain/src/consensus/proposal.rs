//! Consensus proposal entity

use super::evaluation::ConsensusResult;
use super::strategy::VotingStrategy;
use crate::agent::Capabilities;
use crate::core::error::DomainError;
use crate::core::ids::{AgentId, ProposalId, SwarmId, TaskId};
use crate::task::{Task, TaskPriority};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Resolution status of a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    #[default]
    Open,
    Achieved,
    Failed,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Open => "open",
            ProposalStatus::Achieved => "achieved",
            ProposalStatus::Failed => "failed",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ProposalStatus::Open)
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Typed view of the `action` field of a decision payload
///
/// Only an achieved proposal that is linked to a task acts on it.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionAction {
    /// Release a task waiting on the consensus gate
    ApproveTask,
    /// Patch the linked task before it runs
    ModifyTask(TaskModifications),
    /// Cancel the linked task
    CancelTask,
    /// Anything else; resolution only broadcasts the result
    Other(String),
}

impl DecisionAction {
    /// Parse the action out of a decision payload.
    ///
    /// Returns `None` when the payload has no string `action` field.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let action = payload.get("action")?.as_str()?;
        Some(match action {
            "approve_task" => DecisionAction::ApproveTask,
            "modify_task" => DecisionAction::ModifyTask(
                payload
                    .get("modifications")
                    .map(TaskModifications::from_value)
                    .unwrap_or_default(),
            ),
            "cancel_task" => DecisionAction::CancelTask,
            other => DecisionAction::Other(other.to_string()),
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            DecisionAction::ApproveTask => "approve_task",
            DecisionAction::ModifyTask(_) => "modify_task",
            DecisionAction::CancelTask => "cancel_task",
            DecisionAction::Other(name) => name,
        }
    }
}

/// Fields a `modify_task` decision may change
///
/// Unknown keys in the `modifications` object are ignored, as are values of
/// the wrong shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskModifications {
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub max_agents: Option<usize>,
    pub required_capabilities: Option<Capabilities>,
}

impl TaskModifications {
    pub fn from_value(value: &Value) -> Self {
        let description = value
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);
        let priority = value
            .get("priority")
            .and_then(Value::as_str)
            .and_then(|p| p.parse().ok());
        let max_agents = value
            .get("max_agents")
            .and_then(Value::as_u64)
            .map(|n| n as usize);
        let required_capabilities = value
            .get("required_capabilities")
            .and_then(Value::as_array)
            .map(|caps| {
                caps.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            });
        Self {
            description,
            priority,
            max_agents,
            required_capabilities,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.priority.is_none()
            && self.max_agents.is_none()
            && self.required_capabilities.is_none()
    }

    /// Patch a task in place. `max_agents` is kept at least 1.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(max_agents) = self.max_agents {
            task.max_agents = max_agents.max(1);
        }
        if let Some(capabilities) = &self.required_capabilities {
            task.required_capabilities = capabilities.clone();
        }
    }
}

/// A decision put to the agents of one swarm
///
/// # Example
///
/// ```
/// use swarm_domain::consensus::{ConsensusProposal, DecisionAction};
/// use serde_json::json;
///
/// let proposal = ConsensusProposal::new("swarm-1", json!({"action": "approve_task"}), 0.66)
///     .unwrap()
///     .with_task("task-1");
/// assert_eq!(proposal.action(), Some(DecisionAction::ApproveTask));
/// assert!(ConsensusProposal::new("swarm-1", json!({}), 0.0).is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusProposal {
    pub id: ProposalId,
    pub swarm_id: SwarmId,
    pub decision: Value,
    pub required_threshold: f64,
    pub min_participation: f64,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub task_id: Option<TaskId>,
    #[serde(default)]
    pub eligible_voters: Vec<AgentId>,
    #[serde(default)]
    pub status: ProposalStatus,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub result: Option<ConsensusResult>,
}

impl ConsensusProposal {
    pub fn new(
        swarm_id: impl Into<SwarmId>,
        decision: Value,
        required_threshold: f64,
    ) -> Result<Self, DomainError> {
        validate_fraction(required_threshold).map_err(DomainError::InvalidThreshold)?;
        Ok(Self {
            id: ProposalId::generate(),
            swarm_id: swarm_id.into(),
            decision,
            required_threshold,
            min_participation: 1.0,
            deadline: None,
            task_id: None,
            eligible_voters: Vec::new(),
            status: ProposalStatus::Open,
            created_at: Utc::now(),
            result: None,
        })
    }

    pub fn with_id(mut self, id: impl Into<ProposalId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_task(mut self, task_id: impl Into<TaskId>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_min_participation(mut self, min_participation: f64) -> Self {
        self.min_participation = min_participation;
        self
    }

    pub fn with_eligible_voters(mut self, voters: Vec<AgentId>) -> Self {
        self.eligible_voters = voters;
        self
    }

    /// Re-check the numeric invariants.
    ///
    /// Fields are public so records read back from storage go through here
    /// before being trusted.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_fraction(self.required_threshold).map_err(DomainError::InvalidThreshold)?;
        validate_fraction(self.min_participation).map_err(DomainError::InvalidParticipation)?;
        Ok(())
    }

    pub fn action(&self) -> Option<DecisionAction> {
        DecisionAction::from_payload(&self.decision)
    }

    pub fn voting_strategy(&self) -> VotingStrategy {
        VotingStrategy::for_threshold(self.required_threshold)
    }

    pub fn is_eligible(&self, agent_id: &AgentId) -> bool {
        self.eligible_voters.iter().any(|a| a == agent_id)
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    /// Freeze the outcome. A resolved proposal is never resolved again.
    pub fn resolve(&mut self, result: ConsensusResult) -> bool {
        if !self.is_open() {
            return false;
        }
        self.status = if result.achieved {
            ProposalStatus::Achieved
        } else {
            ProposalStatus::Failed
        };
        self.result = Some(result);
        true
    }
}

fn validate_fraction(value: f64) -> Result<(), f64> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::evaluation::ResolutionReason;
    use serde_json::json;

    fn result(achieved: bool) -> ConsensusResult {
        ConsensusResult {
            proposal_id: ProposalId::new("p"),
            achieved,
            ratio: if achieved { 1.0 } else { 0.0 },
            positive_votes: 0,
            negative_votes: 0,
            total_votes: 0,
            eligible_voters: 0,
            participation_rate: 0.0,
            reason: ResolutionReason::Deadline,
        }
    }

    #[test]
    fn test_threshold_bounds() {
        assert!(ConsensusProposal::new("s", json!({}), 1.0).is_ok());
        assert!(ConsensusProposal::new("s", json!({}), 0.01).is_ok());
        assert_eq!(
            ConsensusProposal::new("s", json!({}), 0.0).unwrap_err(),
            DomainError::InvalidThreshold(0.0)
        );
        assert!(ConsensusProposal::new("s", json!({}), 1.2).is_err());
        assert!(ConsensusProposal::new("s", json!({}), f64::NAN).is_err());
    }

    #[test]
    fn test_validate_participation() {
        let proposal = ConsensusProposal::new("s", json!({}), 0.5)
            .unwrap()
            .with_min_participation(0.0);
        assert_eq!(
            proposal.validate().unwrap_err(),
            DomainError::InvalidParticipation(0.0)
        );
    }

    #[test]
    fn test_decision_actions() {
        assert_eq!(
            DecisionAction::from_payload(&json!({"action": "cancel_task"})),
            Some(DecisionAction::CancelTask)
        );
        assert_eq!(DecisionAction::from_payload(&json!({"kind": "x"})), None);
        assert_eq!(
            DecisionAction::from_payload(&json!({"action": "adopt_policy"})),
            Some(DecisionAction::Other("adopt_policy".to_string()))
        );

        let modify = DecisionAction::from_payload(&json!({
            "action": "modify_task",
            "modifications": {
                "description": "Smaller scope",
                "priority": "high",
                "max_agents": 2,
                "required_capabilities": ["rust", 7],
                "colour": "blue"
            }
        }));
        let Some(DecisionAction::ModifyTask(mods)) = modify else {
            panic!("expected modify_task");
        };
        assert_eq!(mods.description.as_deref(), Some("Smaller scope"));
        assert_eq!(mods.priority, Some(TaskPriority::High));
        assert_eq!(mods.max_agents, Some(2));
        assert_eq!(
            mods.required_capabilities,
            Some(Capabilities::from(["rust".to_string()]))
        );
    }

    #[test]
    fn test_apply_modifications() {
        let mut task = Task::new("t", "s", "Build the thing").with_capability("rust");
        let mods = TaskModifications::from_value(&json!({"max_agents": 0, "description": "Build less"}));
        mods.apply_to(&mut task);
        assert_eq!(task.description, "Build less");
        assert_eq!(task.max_agents, 1);
        assert!(task.required_capabilities.contains("rust"));
    }

    #[test]
    fn test_modify_without_modifications_is_empty() {
        let action = DecisionAction::from_payload(&json!({"action": "modify_task"}));
        assert!(matches!(action, Some(DecisionAction::ModifyTask(m)) if m.is_empty()));
    }

    #[test]
    fn test_resolve_is_final() {
        let mut proposal = ConsensusProposal::new("s", json!({}), 0.5).unwrap();
        assert!(proposal.resolve(result(true)));
        assert_eq!(proposal.status, ProposalStatus::Achieved);
        assert!(!proposal.resolve(result(false)));
        assert_eq!(proposal.status, ProposalStatus::Achieved);
        assert!(proposal.result.as_ref().is_some_and(|r| r.achieved));
    }

    #[test]
    fn test_eligibility_and_deadline() {
        let now = Utc::now();
        let proposal = ConsensusProposal::new("s", json!({}), 0.5)
            .unwrap()
            .with_eligible_voters(vec![AgentId::new("a")])
            .with_deadline(now);
        assert!(proposal.is_eligible(&AgentId::new("a")));
        assert!(!proposal.is_eligible(&AgentId::new("b")));
        assert!(proposal.deadline_passed(now));
        assert!(!proposal.deadline_passed(now - chrono::Duration::seconds(1)));
    }
}
