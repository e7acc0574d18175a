//! Phase kinds and agent roles.

use super::checkpoint::ValidationCriterion;
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Executors a single execution phase may fan out to.
pub const MAX_EXECUTORS_PER_PHASE: usize = 3;

/// Role an agent plays inside a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentRole {
    Analyst,
    Architect,
    Researcher,
    Executor,
    Validator,
    ConsensusCoordinator,
    Integrator,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Analyst => "analyst",
            AgentRole::Architect => "architect",
            AgentRole::Researcher => "researcher",
            AgentRole::Executor => "executor",
            AgentRole::Validator => "validator",
            AgentRole::ConsensusCoordinator => "consensus-coordinator",
            AgentRole::Integrator => "integrator",
        }
    }

    /// Capability an agent must declare to take this role
    pub fn capability(&self) -> &'static str {
        match self {
            AgentRole::Analyst => "analysis",
            AgentRole::Architect => "architecture",
            AgentRole::Researcher => "research",
            AgentRole::Executor => "execution",
            AgentRole::Validator => "validation",
            AgentRole::ConsensusCoordinator => "consensus",
            AgentRole::Integrator => "integration",
        }
    }

    /// Every role capability, for registering general-purpose agents
    pub fn all_capabilities() -> [&'static str; 7] {
        [
            AgentRole::Analyst.capability(),
            AgentRole::Architect.capability(),
            AgentRole::Researcher.capability(),
            AgentRole::Executor.capability(),
            AgentRole::Validator.capability(),
            AgentRole::ConsensusCoordinator.capability(),
            AgentRole::Integrator.capability(),
        ]
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AgentRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "analyst" => Ok(AgentRole::Analyst),
            "architect" => Ok(AgentRole::Architect),
            "researcher" => Ok(AgentRole::Researcher),
            "executor" => Ok(AgentRole::Executor),
            "validator" => Ok(AgentRole::Validator),
            "consensus-coordinator" | "consensus_coordinator" => {
                Ok(AgentRole::ConsensusCoordinator)
            }
            "integrator" => Ok(AgentRole::Integrator),
            other => Err(DomainError::UnknownRole(other.to_string())),
        }
    }
}

/// Type of a plan phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseKind {
    Analysis,
    Planning,
    Research,
    Execution,
    ParallelExecution,
    Validation,
    Integration,
    Proposal,
    Voting,
}

impl PhaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseKind::Analysis => "analysis",
            PhaseKind::Planning => "planning",
            PhaseKind::Research => "research",
            PhaseKind::Execution => "execution",
            PhaseKind::ParallelExecution => "parallel-execution",
            PhaseKind::Validation => "validation",
            PhaseKind::Integration => "integration",
            PhaseKind::Proposal => "proposal",
            PhaseKind::Voting => "voting",
        }
    }

    /// Role that works this phase
    pub fn role(&self) -> AgentRole {
        match self {
            PhaseKind::Analysis => AgentRole::Analyst,
            PhaseKind::Planning => AgentRole::Architect,
            PhaseKind::Research => AgentRole::Researcher,
            PhaseKind::Execution | PhaseKind::ParallelExecution => AgentRole::Executor,
            PhaseKind::Validation => AgentRole::Validator,
            PhaseKind::Integration => AgentRole::Integrator,
            PhaseKind::Proposal | PhaseKind::Voting => AgentRole::ConsensusCoordinator,
        }
    }

    /// Number of assignments to create, given how many agents may be used.
    ///
    /// Execution phases fan out to at most [`MAX_EXECUTORS_PER_PHASE`]
    /// executors; every other phase gets exactly one agent.
    pub fn assignment_count(&self, agent_cap: usize) -> usize {
        match self {
            PhaseKind::Execution | PhaseKind::ParallelExecution => {
                agent_cap.clamp(1, MAX_EXECUTORS_PER_PHASE)
            }
            PhaseKind::Analysis
            | PhaseKind::Planning
            | PhaseKind::Research
            | PhaseKind::Validation
            | PhaseKind::Integration
            | PhaseKind::Proposal
            | PhaseKind::Voting => 1,
        }
    }

    /// Whether assignments of this phase may run alongside sibling work
    pub fn is_parallel_capable(&self) -> bool {
        match self {
            PhaseKind::Analysis | PhaseKind::Research | PhaseKind::ParallelExecution => true,
            PhaseKind::Planning
            | PhaseKind::Execution
            | PhaseKind::Validation
            | PhaseKind::Integration
            | PhaseKind::Proposal
            | PhaseKind::Voting => false,
        }
    }

    pub fn responsibilities(&self) -> &'static [&'static str] {
        match self {
            PhaseKind::Analysis => &[
                "Analyze task requirements",
                "Identify constraints and risks",
            ],
            PhaseKind::Planning => &["Design the approach", "Break work into steps"],
            PhaseKind::Research => &["Gather background information", "Summarize findings"],
            PhaseKind::Execution | PhaseKind::ParallelExecution => {
                &["Implement the planned work", "Report produced artifacts"]
            }
            PhaseKind::Validation => &["Verify results against requirements", "Report defects"],
            PhaseKind::Integration => &["Merge partial results", "Resolve conflicts"],
            PhaseKind::Proposal => &["Draft a decision proposal for the swarm"],
            PhaseKind::Voting => &["Collect votes", "Report the consensus outcome"],
        }
    }

    pub fn expected_output(&self) -> &'static str {
        match self {
            PhaseKind::Analysis => "analysis_report",
            PhaseKind::Planning => "execution_design",
            PhaseKind::Research => "research_summary",
            PhaseKind::Execution | PhaseKind::ParallelExecution => "implementation",
            PhaseKind::Validation => "validation_report",
            PhaseKind::Integration => "integrated_result",
            PhaseKind::Proposal => "proposal",
            PhaseKind::Voting => "consensus_decision",
        }
    }

    /// Weighted quality criteria evaluated at this phase's checkpoint.
    ///
    /// Weights in this table already sum to 1.0.
    pub fn criteria(&self) -> Vec<ValidationCriterion> {
        let table: &[(&str, f64)] = match self {
            PhaseKind::Analysis => &[("completeness", 0.6), ("accuracy", 0.4)],
            PhaseKind::Planning => &[("feasibility", 0.5), ("completeness", 0.5)],
            PhaseKind::Research => &[("coverage", 0.6), ("relevance", 0.4)],
            PhaseKind::Execution | PhaseKind::ParallelExecution => {
                &[("correctness", 0.7), ("performance", 0.3)]
            }
            PhaseKind::Validation => &[("correctness", 0.5), ("test_coverage", 0.5)],
            PhaseKind::Integration => &[("consistency", 0.6), ("correctness", 0.4)],
            PhaseKind::Proposal => &[("clarity", 1.0)],
            PhaseKind::Voting => &[("participation", 0.5), ("agreement", 0.5)],
        };
        table
            .iter()
            .map(|(name, weight)| ValidationCriterion::new(*name, *weight))
            .collect()
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PhaseKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "analysis" => Ok(PhaseKind::Analysis),
            "planning" => Ok(PhaseKind::Planning),
            "research" => Ok(PhaseKind::Research),
            "execution" => Ok(PhaseKind::Execution),
            "parallel-execution" | "parallel_execution" => Ok(PhaseKind::ParallelExecution),
            "validation" => Ok(PhaseKind::Validation),
            "integration" => Ok(PhaseKind::Integration),
            "proposal" => Ok(PhaseKind::Proposal),
            "voting" | "consensus" => Ok(PhaseKind::Voting),
            other => Err(DomainError::UnknownPhase(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [PhaseKind; 9] = [
        PhaseKind::Analysis,
        PhaseKind::Planning,
        PhaseKind::Research,
        PhaseKind::Execution,
        PhaseKind::ParallelExecution,
        PhaseKind::Validation,
        PhaseKind::Integration,
        PhaseKind::Proposal,
        PhaseKind::Voting,
    ];

    #[test]
    fn test_criteria_weights_sum_to_one() {
        for kind in ALL {
            let sum: f64 = kind.criteria().iter().map(|c| c.weight).sum();
            assert!((sum - 1.0).abs() < 1e-9, "{kind} weights sum to {sum}");
        }
    }

    #[test]
    fn test_execution_fans_out_up_to_three() {
        assert_eq!(PhaseKind::Execution.assignment_count(10), 3);
        assert_eq!(PhaseKind::ParallelExecution.assignment_count(2), 2);
        assert_eq!(PhaseKind::Execution.assignment_count(0), 1);
        assert_eq!(PhaseKind::Analysis.assignment_count(10), 1);
    }

    #[test]
    fn test_roles() {
        assert_eq!(PhaseKind::Analysis.role(), AgentRole::Analyst);
        assert_eq!(PhaseKind::Voting.role(), AgentRole::ConsensusCoordinator);
        assert_eq!(
            AgentRole::ConsensusCoordinator.to_string(),
            "consensus-coordinator"
        );
    }

    #[test]
    fn test_parse_round_trip() {
        for kind in ALL {
            assert_eq!(kind.as_str().parse::<PhaseKind>().unwrap(), kind);
        }
        assert_eq!(
            "consensus".parse::<PhaseKind>().unwrap(),
            PhaseKind::Voting
        );
        assert!(matches!(
            "dance".parse::<PhaseKind>(),
            Err(DomainError::UnknownPhase(_))
        ));
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&PhaseKind::ParallelExecution).unwrap();
        assert_eq!(json, "\"parallel-execution\"");
    }
}
