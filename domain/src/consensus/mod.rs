//! Consensus domain
//!
//! Threshold voting over [`ConsensusProposal`]s. The rules here are pure:
//! given a proposal and the votes cast so far, [`evaluate`] decides whether
//! the proposal stays open, is achieved, or has failed. Storage, deadlines
//! and broadcasting belong to the consensus engine in the application layer.
//!
//! # Life-cycle
//!
//! ```text
//!            vote / monitor tick                deadline
//!   Open ─────────────────────────► Achieved ◄──────────┐
//!     │   ratio ≥ threshold and              (ratio ≥   │
//!     │   participation reached               threshold)│
//!     │                                                 │
//!     └──────────────► Failed ◄─────────────────────────┘
//!        everyone voted,              otherwise
//!        threshold missed
//! ```
//!
//! Once resolved a proposal never changes again; its [`ConsensusResult`] is
//! frozen on the record.

pub mod evaluation;
pub mod metrics;
pub mod proposal;
pub mod strategy;
pub mod vote;

pub use evaluation::{ConsensusOutcome, ConsensusResult, ResolutionReason, evaluate};
pub use metrics::ConsensusMetrics;
pub use proposal::{ConsensusProposal, DecisionAction, ProposalStatus, TaskModifications};
pub use strategy::{ProposalAssessment, VotingRecommendation, VotingStrategy};
pub use vote::{ConsensusVote, VoteTally};
