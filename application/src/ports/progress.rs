//! Progress notification port
//!
//! Defines the interface for reporting progress during task execution.

use swarm_domain::{AgentRole, PhaseKind, TaskId, TaskStatus};

/// Callback for progress updates during task execution
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (console, progress bars, etc.)
pub trait ProgressNotifier: Send + Sync {
    /// Called when a phase starts
    fn on_phase_start(&self, task_id: &TaskId, phase: PhaseKind, total_assignments: usize);

    /// Called when one assignment of a phase finishes
    fn on_assignment_complete(&self, task_id: &TaskId, phase: PhaseKind, role: AgentRole, success: bool);

    /// Called when a phase completes and its checkpoint has been scored
    fn on_phase_complete(&self, task_id: &TaskId, phase: PhaseKind, score: f64, passed: bool);

    /// Called once the task reaches a terminal state
    fn on_task_finished(&self, _task_id: &TaskId, _status: TaskStatus) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {
    fn on_phase_start(&self, _task_id: &TaskId, _phase: PhaseKind, _total_assignments: usize) {}
    fn on_assignment_complete(
        &self,
        _task_id: &TaskId,
        _phase: PhaseKind,
        _role: AgentRole,
        _success: bool,
    ) {
    }
    fn on_phase_complete(&self, _task_id: &TaskId, _phase: PhaseKind, _score: f64, _passed: bool) {}
}
