//! Execution planning domain
//!
//! An [`ExecutionPlan`](entities::ExecutionPlan) breaks one task into phases.
//! Everything that varies per phase type (which role works it, how many
//! agents, which validation criteria gate it) is an exhaustive `match` on
//! [`PhaseKind`](phase::PhaseKind), so adding a phase type is a compile error
//! until every table handles it.
//!
//! ```text
//! Task ──► StrategyDescriptor ──► [PhaseKind...] ──► PlannedPhase { assignments, checkpoint }
//!                 ▲
//!      ComplexityEstimate (analysis service)
//! ```

pub mod checkpoint;
pub mod entities;
pub mod estimate;
pub mod phase;
pub mod strategy;

pub use checkpoint::{Checkpoint, CheckpointEvaluation, ValidationCriterion};
pub use entities::{ExecutionPlan, PlannedPhase, TaskAssignment};
pub use estimate::{Complexity, ComplexityEstimate, ResourceRequirements, TaskAnalysisRequest};
pub use phase::{AgentRole, PhaseKind};
pub use strategy::{StrategyDescriptor, StrategyKind};
