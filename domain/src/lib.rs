//! Domain layer for swarm-orchestrator
//!
//! This crate contains the core business rules, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Tasks and plans
//!
//! A [`Task`] is submitted by a caller and turned into an [`ExecutionPlan`]:
//! an ordered list of [`PhaseKind`]s, each with its agent assignments and a
//! [`Checkpoint`] that gates progress to the next phase.
//!
//! ## Agents
//!
//! An [`AgentRecord`] is `busy` exactly when it holds a current task. Agents
//! are matched to assignments by capability and ranked by their recorded
//! [`AgentPerformance`].
//!
//! ## Consensus
//!
//! A [`ConsensusProposal`] is voted on by the agents of a swarm and resolved
//! by threshold (see [`consensus::evaluate`]).

pub mod agent;
pub mod config;
pub mod consensus;
pub mod core;
pub mod messaging;
pub mod plan;
pub mod task;

// Re-export commonly used types
pub use agent::{
    AgentPerformance, AgentRecord, AgentResult, AgentStatus, Capabilities, LoadDistribution,
    RebalanceSuggestion, UnassignedTask,
};
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, ProgressStyle, Severity};
pub use consensus::{
    ConsensusMetrics, ConsensusOutcome, ConsensusProposal, ConsensusResult, ConsensusVote,
    DecisionAction, ProposalAssessment, ProposalStatus, ResolutionReason, TaskModifications,
    VoteTally, VotingRecommendation, VotingStrategy,
};
pub use core::{
    error::DomainError,
    ids::{AgentId, ProposalId, SwarmId, TaskId},
};
pub use messaging::{Communication, MessagePriority, MessageType, Recipient, SwarmEvent, Topic};
pub use plan::{
    AgentRole, Checkpoint, CheckpointEvaluation, Complexity, ComplexityEstimate, ExecutionPlan,
    PhaseKind, PlannedPhase, ResourceRequirements, StrategyDescriptor, StrategyKind,
    TaskAnalysisRequest, TaskAssignment, ValidationCriterion,
};
pub use task::{
    AssignmentOutcome, ExecutionReport, ExecutionStatus, ExecutionSummary, PhaseResult,
    PhaseSummary, Task, TaskPriority, TaskStatus, TaskStrategy,
};
