//! Vote types for consensus proposals

use crate::core::ids::{AgentId, ProposalId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single agent's vote on a proposal
///
/// # Example
///
/// ```
/// use swarm_domain::consensus::ConsensusVote;
///
/// let yes = ConsensusVote::approve("p1", "agent-a").with_reason("Plan is sound");
/// assert!(yes.vote);
/// assert_eq!(yes.reason.as_deref(), Some("Plan is sound"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusVote {
    pub proposal_id: ProposalId,
    pub agent_id: AgentId,
    pub vote: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default = "Utc::now")]
    pub cast_at: DateTime<Utc>,
}

impl ConsensusVote {
    pub fn new(
        proposal_id: impl Into<ProposalId>,
        agent_id: impl Into<AgentId>,
        vote: bool,
    ) -> Self {
        Self {
            proposal_id: proposal_id.into(),
            agent_id: agent_id.into(),
            vote,
            reason: None,
            cast_at: Utc::now(),
        }
    }

    pub fn approve(proposal_id: impl Into<ProposalId>, agent_id: impl Into<AgentId>) -> Self {
        Self::new(proposal_id, agent_id, true)
    }

    pub fn reject(proposal_id: impl Into<ProposalId>, agent_id: impl Into<AgentId>) -> Self {
        Self::new(proposal_id, agent_id, false)
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Counts over the votes cast on one proposal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoteTally {
    pub positive: usize,
    pub negative: usize,
    pub votes: Vec<ConsensusVote>,
}

impl VoteTally {
    pub fn from_votes(votes: Vec<ConsensusVote>) -> Self {
        let positive = votes.iter().filter(|v| v.vote).count();
        let negative = votes.len() - positive;
        Self {
            positive,
            negative,
            votes,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative
    }

    /// positive / cast, 0.0 when nothing was cast
    pub fn ratio(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.positive as f64 / self.total() as f64
        }
    }

    /// Visual summary (e.g. "[●●○]")
    pub fn vote_summary(&self) -> String {
        let mut summary = String::from("[");
        for vote in &self.votes {
            summary.push(if vote.vote { '●' } else { '○' });
        }
        summary.push(']');
        summary
    }

    /// Reasons given by rejecting agents, one per line
    pub fn rejection_reasons(&self) -> String {
        self.votes
            .iter()
            .filter(|v| !v.vote)
            .filter_map(|v| v.reason.as_ref().map(|r| format!("{}: {}", v.agent_id, r)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
