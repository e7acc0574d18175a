//! Advisory voting strategies
//!
//! The strategy never decides a proposal; it only tells an agent how it
//! ought to vote given the analysis service's assessment.

use crate::core::ids::{AgentId, ProposalId};
use serde::{Deserialize, Serialize};

/// Threshold at or above which a proposal is treated as a supermajority vote
pub const SUPERMAJORITY_THRESHOLD: f64 = 0.66;

/// Analysis of one proposal from one agent's point of view
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProposalAssessment {
    pub recommendation: bool,
    pub strong_recommendation: bool,
    pub perfect_alignment: bool,
    /// 0.0 - 1.0
    pub expertise_alignment: f64,
}

/// Voting strategy implied by a proposal's threshold
///
/// # Example
///
/// ```
/// use swarm_domain::consensus::VotingStrategy;
///
/// assert_eq!(VotingStrategy::for_threshold(1.0), VotingStrategy::Unanimous);
/// assert_eq!(VotingStrategy::for_threshold(0.66), VotingStrategy::Supermajority);
/// assert_eq!(VotingStrategy::for_threshold(0.5), VotingStrategy::SimpleMajority);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingStrategy {
    Unanimous,
    Supermajority,
    SimpleMajority,
}

impl VotingStrategy {
    pub fn for_threshold(threshold: f64) -> Self {
        if threshold >= 1.0 {
            VotingStrategy::Unanimous
        } else if threshold >= SUPERMAJORITY_THRESHOLD {
            VotingStrategy::Supermajority
        } else {
            VotingStrategy::SimpleMajority
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VotingStrategy::Unanimous => "unanimous",
            VotingStrategy::Supermajority => "supermajority",
            VotingStrategy::SimpleMajority => "simple_majority",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            VotingStrategy::Unanimous => "unanimous (all must approve)",
            VotingStrategy::Supermajority => "supermajority (at least two thirds)",
            VotingStrategy::SimpleMajority => "simple majority",
        }
    }

    /// Derive a vote, confidence and reasoning from an assessment.
    pub fn recommend(&self, assessment: &ProposalAssessment) -> (bool, f64, String) {
        let expertise = assessment.expertise_alignment.clamp(0.0, 1.0);
        match self {
            VotingStrategy::Unanimous => {
                let vote = assessment.perfect_alignment;
                let confidence = if vote { 0.95 } else { 0.3 };
                let reasoning = if vote {
                    "Proposal aligns fully with this agent's assessment; unanimous approval is safe"
                } else {
                    "Unanimous consensus requires complete alignment, which this proposal lacks"
                };
                (vote, confidence, reasoning.to_string())
            }
            VotingStrategy::Supermajority => {
                let vote = assessment.strong_recommendation;
                let confidence = if vote { 0.8 } else { 0.4 };
                let reasoning = if vote {
                    "Strong support from the assessment meets the supermajority bar"
                } else {
                    "Support is not strong enough to back a supermajority decision"
                };
                (vote, confidence, reasoning.to_string())
            }
            VotingStrategy::SimpleMajority => {
                let vote = assessment.recommendation;
                let reasoning = format!(
                    "Simple majority vote following the assessment ({:.0}% expertise alignment)",
                    expertise * 100.0
                );
                (vote, expertise, reasoning)
            }
        }
    }
}

impl std::fmt::Display for VotingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for VotingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "unanimous" => Ok(VotingStrategy::Unanimous),
            "supermajority" => Ok(VotingStrategy::Supermajority),
            "simple_majority" | "majority" => Ok(VotingStrategy::SimpleMajority),
            _ => Err(format!(
                "Unknown voting strategy: {}. Valid: unanimous, supermajority, simple_majority",
                s
            )),
        }
    }
}

/// Advice handed to an agent before it votes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VotingRecommendation {
    pub proposal_id: ProposalId,
    pub agent_id: AgentId,
    pub strategy: VotingStrategy,
    pub vote: bool,
    pub confidence: f64,
    pub reasoning: String,
}

impl VotingRecommendation {
    pub fn new(
        proposal_id: ProposalId,
        agent_id: AgentId,
        strategy: VotingStrategy,
        assessment: &ProposalAssessment,
    ) -> Self {
        let (vote, confidence, reasoning) = strategy.recommend(assessment);
        Self {
            proposal_id,
            agent_id,
            strategy,
            vote,
            confidence,
            reasoning,
        }
    }
}
