//! Progress reporting for task execution

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Mutex;
use swarm_application::ProgressNotifier;
use swarm_domain::{AgentRole, PhaseKind, TaskId, TaskStatus};

/// Reports progress with one bar per running phase
///
/// Several tasks may run at once, so bars are keyed by task.
pub struct ProgressReporter {
    multi: MultiProgress,
    bars: Mutex<HashMap<TaskId, ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn phase_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn prefix(task_id: &TaskId, phase: PhaseKind) -> String {
        format!("{} {}", task_id, phase.as_str())
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressNotifier for ProgressReporter {
    fn on_phase_start(&self, task_id: &TaskId, phase: PhaseKind, total_assignments: usize) {
        let pb = self.multi.add(ProgressBar::new(total_assignments as u64));
        pb.set_style(Self::phase_style());
        pb.set_prefix(Self::prefix(task_id, phase));
        pb.set_message("Starting...");

        if let Ok(mut bars) = self.bars.lock()
            && let Some(previous) = bars.insert(task_id.clone(), pb)
        {
            previous.finish_and_clear();
        }
    }

    fn on_assignment_complete(
        &self,
        task_id: &TaskId,
        _phase: PhaseKind,
        role: AgentRole,
        success: bool,
    ) {
        if let Ok(bars) = self.bars.lock()
            && let Some(pb) = bars.get(task_id)
        {
            let status = if success {
                format!("{} {}", "v".green(), role.as_str())
            } else {
                format!("{} {}", "x".red(), role.as_str())
            };
            pb.set_message(status);
            pb.inc(1);
        }
    }

    fn on_phase_complete(&self, task_id: &TaskId, phase: PhaseKind, score: f64, passed: bool) {
        if let Ok(mut bars) = self.bars.lock()
            && let Some(pb) = bars.remove(task_id)
        {
            let verdict = if passed {
                format!("{} (score {:.2})", "passed".green(), score)
            } else {
                format!("{} (score {:.2})", "failed".red(), score)
            };
            pb.finish_with_message(format!("{} {}", phase.as_str(), verdict));
        }
    }

    fn on_task_finished(&self, task_id: &TaskId, _status: TaskStatus) {
        if let Ok(mut bars) = self.bars.lock()
            && let Some(pb) = bars.remove(task_id)
        {
            pb.abandon();
        }
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl ProgressNotifier for SimpleProgress {
    fn on_phase_start(&self, task_id: &TaskId, phase: PhaseKind, total_assignments: usize) {
        println!(
            "{} {} {} ({} assignments)",
            "->".cyan(),
            task_id,
            phase.as_str().bold(),
            total_assignments
        );
    }

    fn on_assignment_complete(
        &self,
        _task_id: &TaskId,
        _phase: PhaseKind,
        role: AgentRole,
        success: bool,
    ) {
        if success {
            println!("  {} {}", "v".green(), role.as_str());
        } else {
            println!("  {} {} (failed)", "x".red(), role.as_str());
        }
    }

    fn on_phase_complete(&self, _task_id: &TaskId, _phase: PhaseKind, score: f64, passed: bool) {
        if !passed {
            println!("  {} checkpoint scored {:.2}", "x".red(), score);
        }
    }

    fn on_task_finished(&self, task_id: &TaskId, status: TaskStatus) {
        println!("{} {} {}", "=>".cyan(), task_id, status);
        println!();
    }
}
