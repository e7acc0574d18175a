//! Proposal evaluation
//!
//! [`evaluate`] is the single place where a tally is turned into a decision.
//! The consensus engine calls it after every vote, from the proposal monitor,
//! and (forced) when a deadline fires.

use super::proposal::ConsensusProposal;
use super::vote::VoteTally;
use crate::core::ids::ProposalId;
use serde::{Deserialize, Serialize};

/// Why a proposal stopped being open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionReason {
    ThresholdMet,
    AllVoted,
    Deadline,
}

impl ResolutionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionReason::ThresholdMet => "threshold_met",
            ResolutionReason::AllVoted => "all_voted",
            ResolutionReason::Deadline => "deadline",
        }
    }
}

impl std::fmt::Display for ResolutionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final tally of a resolved proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub proposal_id: ProposalId,
    pub achieved: bool,
    pub ratio: f64,
    pub positive_votes: usize,
    pub negative_votes: usize,
    pub total_votes: usize,
    pub eligible_voters: usize,
    pub participation_rate: f64,
    pub reason: ResolutionReason,
}

/// Outcome of one evaluation pass
#[derive(Debug, Clone, PartialEq)]
pub enum ConsensusOutcome {
    /// Still collecting votes
    Pending { ratio: f64, participation_rate: f64 },
    Achieved(ConsensusResult),
    Failed(ConsensusResult),
}

impl ConsensusOutcome {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, ConsensusOutcome::Pending { .. })
    }

    pub fn result(&self) -> Option<&ConsensusResult> {
        match self {
            ConsensusOutcome::Pending { .. } => None,
            ConsensusOutcome::Achieved(result) | ConsensusOutcome::Failed(result) => Some(result),
        }
    }

    pub fn into_result(self) -> Option<ConsensusResult> {
        match self {
            ConsensusOutcome::Pending { .. } => None,
            ConsensusOutcome::Achieved(result) | ConsensusOutcome::Failed(result) => Some(result),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConsensusOutcome::Pending { .. } => "open",
            ConsensusOutcome::Achieved(_) => "achieved",
            ConsensusOutcome::Failed(_) => "failed",
        }
    }
}

impl std::fmt::Display for ConsensusOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsensusOutcome::Pending {
                ratio,
                participation_rate,
            } => write!(
                f,
                "open (ratio {:.3}, participation {:.0}%)",
                ratio,
                participation_rate * 100.0
            ),
            ConsensusOutcome::Achieved(r) | ConsensusOutcome::Failed(r) => write!(
                f,
                "{} ({}/{} approve, ratio {:.3}, {})",
                self.label(),
                r.positive_votes,
                r.total_votes,
                r.ratio,
                r.reason
            ),
        }
    }
}

/// Decide a proposal from its current tally.
///
/// - Achieved: at least one vote, `ratio >= threshold`, and participation has
///   reached `min_participation` (ignored when `forced`).
/// - Failed: every eligible voter has voted without achieving, or `forced`
///   without achieving.
/// - Pending otherwise.
///
/// A proposal with no eligible voters can never collect a vote and fails on
/// its first evaluation.
pub fn evaluate(proposal: &ConsensusProposal, tally: &VoteTally, forced: bool) -> ConsensusOutcome {
    let cast = tally.total();
    let eligible = proposal.eligible_voters.len();
    let ratio = tally.ratio();
    let participation_rate = if eligible == 0 {
        0.0
    } else {
        (cast as f64 / eligible as f64).min(1.0)
    };

    let build = |achieved: bool, reason: ResolutionReason| ConsensusResult {
        proposal_id: proposal.id.clone(),
        achieved,
        ratio,
        positive_votes: tally.positive,
        negative_votes: tally.negative,
        total_votes: cast,
        eligible_voters: eligible,
        participation_rate,
        reason,
    };

    let threshold_met = cast > 0 && ratio >= proposal.required_threshold;
    let participation_met = participation_rate >= proposal.min_participation;
    let all_voted = cast >= eligible;

    if threshold_met && (forced || participation_met) {
        let reason = if forced && !participation_met {
            ResolutionReason::Deadline
        } else {
            ResolutionReason::ThresholdMet
        };
        ConsensusOutcome::Achieved(build(true, reason))
    } else if forced {
        ConsensusOutcome::Failed(build(false, ResolutionReason::Deadline))
    } else if all_voted {
        ConsensusOutcome::Failed(build(false, ResolutionReason::AllVoted))
    } else {
        ConsensusOutcome::Pending {
            ratio,
            participation_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::vote::ConsensusVote;
    use crate::core::ids::AgentId;
    use serde_json::json;

    fn proposal(threshold: f64, voters: &[&str]) -> ConsensusProposal {
        ConsensusProposal::new("swarm", json!({}), threshold)
            .unwrap()
            .with_id("p")
            .with_eligible_voters(voters.iter().map(|v| AgentId::new(*v)).collect())
    }

    fn tally(votes: &[(&str, bool)]) -> VoteTally {
        VoteTally::from_votes(
            votes
                .iter()
                .map(|(agent, vote)| ConsensusVote::new("p", *agent, *vote))
                .collect(),
        )
    }

    #[test]
    fn test_two_of_three_meets_supermajority() {
        let p = proposal(0.66, &["a", "b", "c"]);

        let partial = evaluate(&p, &tally(&[("a", true), ("b", true)]), false);
        assert!(!partial.is_resolved());

        let outcome = evaluate(&p, &tally(&[("a", true), ("b", true), ("c", false)]), false);
        let ConsensusOutcome::Achieved(result) = outcome else {
            panic!("expected achieved, got {outcome:?}");
        };
        assert!((result.ratio - 0.667).abs() < 0.001);
        assert_eq!(result.positive_votes, 2);
        assert_eq!(result.negative_votes, 1);
        assert_eq!(result.participation_rate, 1.0);
        assert_eq!(result.reason, ResolutionReason::ThresholdMet);
    }

    #[test]
    fn test_all_voted_below_threshold_fails() {
        let p = proposal(1.0, &["a", "b"]);
        let outcome = evaluate(&p, &tally(&[("a", true), ("b", false)]), false);
        assert!(matches!(
            outcome,
            ConsensusOutcome::Failed(ConsensusResult {
                reason: ResolutionReason::AllVoted,
                ..
            })
        ));
    }

    #[test]
    fn test_low_participation_resolves_early() {
        let p = proposal(0.5, &["a", "b", "c", "d"]).with_min_participation(0.5);
        let outcome = evaluate(&p, &tally(&[("a", true), ("b", true)]), false);
        let result = outcome.result().cloned().unwrap();
        assert!(result.achieved);
        assert_eq!(result.reason, ResolutionReason::ThresholdMet);
        assert_eq!(result.participation_rate, 0.5);
    }

    #[test]
    fn test_forced_without_votes_fails() {
        let p = proposal(0.66, &["a", "b", "c"]);
        let outcome = evaluate(&p, &VoteTally::default(), true);
        let ConsensusOutcome::Failed(result) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(result.participation_rate, 0.0);
        assert_eq!(result.ratio, 0.0);
        assert_eq!(result.reason, ResolutionReason::Deadline);
    }

    #[test]
    fn test_forced_ignores_participation() {
        let p = proposal(0.5, &["a", "b", "c"]);
        let outcome = evaluate(&p, &tally(&[("a", true)]), true);
        assert!(matches!(
            outcome,
            ConsensusOutcome::Achieved(ConsensusResult {
                reason: ResolutionReason::Deadline,
                ..
            })
        ));
    }

    #[test]
    fn test_no_eligible_voters_fails() {
        let p = proposal(0.5, &[]);
        assert!(matches!(
            evaluate(&p, &VoteTally::default(), false),
            ConsensusOutcome::Failed(_)
        ));
    }

    #[test]
    fn test_achieved_implies_ratio_at_least_threshold() {
        let voters = ["a", "b", "c", "d", "e"];
        for threshold in [0.2, 0.5, 0.66, 0.8, 1.0] {
            let p = proposal(threshold, &voters);
            for yes in 0..=voters.len() {
                let votes: Vec<(&str, bool)> = voters
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (*v, i < yes))
                    .collect();
                let outcome = evaluate(&p, &tally(&votes), false);
                let result = outcome.result().unwrap();
                assert!((0.0..=1.0).contains(&result.ratio));
                if result.achieved {
                    assert!(result.ratio >= threshold);
                }
            }
        }
    }
}
