//! Console output formatter for tasks and proposals

use colored::Colorize;
use serde::Serialize;
use swarm_application::{ExecutionSnapshot, ProposalSnapshot};
use swarm_domain::core::string::summary_line;
use swarm_domain::{ExecutionReport, OutputFormat, ProposalStatus, Task, TaskStatus};

/// Longest error or output line printed before truncation
const MAX_DETAIL_LEN: usize = 96;

/// Formats orchestration results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format a task in the requested format
    pub fn task(task: &Task, format: OutputFormat) -> String {
        match format {
            OutputFormat::Text => Self::format_task(task),
            OutputFormat::Json => Self::format_json(task),
        }
    }

    /// Format a proposal snapshot in the requested format
    pub fn proposal(snapshot: &ProposalSnapshot, format: OutputFormat) -> String {
        match format {
            OutputFormat::Text => Self::format_proposal(snapshot),
            OutputFormat::Json => Self::format_json(snapshot),
        }
    }

    pub fn format_task(task: &Task) -> String {
        let mut output = String::new();

        output.push_str(&Self::header(&format!("Task {}", task.id)));
        output.push('\n');
        output.push_str(&format!(
            "{} {}\n",
            "Description:".cyan().bold(),
            summary_line(&task.description, MAX_DETAIL_LEN)
        ));
        output.push_str(&format!(
            "{} {}   {} {}   {} {}\n",
            "Status:".cyan().bold(),
            Self::status_label(task.status),
            "Strategy:".cyan().bold(),
            task.strategy,
            "Priority:".cyan().bold(),
            task.priority.as_str()
        ));
        output.push_str(&format!(
            "{} {:.0}%\n",
            "Progress:".cyan().bold(),
            task.progress
        ));
        if !task.assigned_agents.is_empty() {
            let agents: Vec<&str> = task.assigned_agents.iter().map(|a| a.as_str()).collect();
            output.push_str(&format!(
                "{} {}\n",
                "Agents:".cyan().bold(),
                agents.join(", ")
            ));
        }
        if let Some(error) = &task.error {
            output.push_str(&format!(
                "{} {}\n",
                "Error:".red().bold(),
                summary_line(error, MAX_DETAIL_LEN)
            ));
        }

        let report = task
            .result
            .as_ref()
            .and_then(|r| serde_json::from_value::<ExecutionReport>(r.clone()).ok());
        if let Some(report) = report {
            output.push_str(&Self::format_report(&report));
        }

        output.push_str(&Self::footer());
        output
    }

    /// Per-phase breakdown of a finished execution
    pub fn format_report(report: &ExecutionReport) -> String {
        let mut output = Self::section_header("Phases");
        for phase in &report.phase_results {
            let marker = if phase.is_successful() {
                "v".green()
            } else {
                "x".red()
            };
            let rate = phase
                .success_rate()
                .map(|r| format!("{:.0}%", r * 100.0))
                .unwrap_or_else(|| "-".to_string());
            output.push_str(&format!(
                "  {} {:>2}. {:<20} {} assignment(s), {} succeeded\n",
                marker,
                phase.phase_index + 1,
                phase.phase.as_str(),
                phase.summary.total_executions,
                rate
            ));
            for outcome in phase.results.iter().filter(|r| !r.success) {
                if let Some(error) = &outcome.error {
                    output.push_str(&format!(
                        "        {}\n",
                        summary_line(error, MAX_DETAIL_LEN).dimmed()
                    ));
                }
            }
        }
        output.push_str(&format!(
            "\n{} {}/{} phases succeeded in {} ms\n",
            "Summary:".cyan().bold(),
            report.summary.successful_phases,
            report.summary.total_phases,
            report.duration_ms
        ));
        output
    }

    pub fn format_proposal(snapshot: &ProposalSnapshot) -> String {
        let mut output = String::new();

        output.push_str(&Self::header(&format!("Proposal {}", snapshot.proposal_id)));
        output.push('\n');

        let status = match snapshot.status {
            ProposalStatus::Open => snapshot.status.as_str().yellow(),
            ProposalStatus::Achieved => snapshot.status.as_str().green().bold(),
            ProposalStatus::Failed => snapshot.status.as_str().red().bold(),
        };
        output.push_str(&format!("{} {}\n", "Status:".cyan().bold(), status));
        output.push_str(&format!(
            "{} {:.2} ({})\n",
            "Threshold:".cyan().bold(),
            snapshot.threshold,
            snapshot.strategy.description()
        ));
        output.push_str(&format!(
            "{} {} {} for, {} against, {} of {} voted (ratio {:.3})\n",
            "Votes:".cyan().bold(),
            snapshot.vote_summary,
            snapshot.positive_votes,
            snapshot.negative_votes,
            snapshot.total_votes,
            snapshot.eligible_voters,
            snapshot.ratio
        ));
        if let Some(deadline) = snapshot.deadline {
            output.push_str(&format!(
                "{} {}\n",
                "Deadline:".cyan().bold(),
                deadline.to_rfc3339()
            ));
        }
        if let Some(result) = &snapshot.result {
            output.push_str(&format!(
                "{} {} (participation {:.0}%)\n",
                "Resolved:".cyan().bold(),
                result.reason.as_str(),
                result.participation_rate * 100.0
            ));
        }

        output.push_str(&Self::footer());
        output
    }

    /// One line per running execution
    pub fn format_executions(executions: &[ExecutionSnapshot]) -> String {
        if executions.is_empty() {
            return format!("{}\n", "No active executions".dimmed());
        }
        executions
            .iter()
            .map(|e| {
                format!(
                    "  {} phase {}/{} ({} done, {} ms)\n",
                    e.task_id.as_str().bold(),
                    e.current_phase + 1,
                    e.total_phases,
                    e.completed_phases,
                    e.elapsed_ms
                )
            })
            .collect()
    }

    pub fn format_json<T: Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }

    fn status_label(status: TaskStatus) -> colored::ColoredString {
        match status {
            TaskStatus::Completed => status.as_str().green().bold(),
            TaskStatus::Failed => status.as_str().red().bold(),
            TaskStatus::Cancelled => status.as_str().magenta(),
            TaskStatus::Queued | TaskStatus::AwaitingConsensus | TaskStatus::Executing => {
                status.as_str().yellow()
            }
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("{}\n", "=".repeat(60).cyan())
    }
}
