//! Task domain
//!
//! A [`Task`](entities::Task) is the unit of work a caller submits. The Task
//! Supervisor is the only writer of its mutable fields (status, progress,
//! result, error); everything else is fixed at submission.
//!
//! [`execution`] holds the per-phase result and report types produced while a
//! task runs.

pub mod entities;
pub mod execution;

pub use entities::{Task, TaskPriority, TaskStatus, TaskStrategy};
pub use execution::{
    AssignmentOutcome, ExecutionReport, ExecutionStatus, ExecutionSummary, PhaseResult,
    PhaseSummary,
};
