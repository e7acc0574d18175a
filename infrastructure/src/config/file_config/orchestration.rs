//! Orchestration configuration from TOML (`[orchestration]` section)
//!
//! Example configuration:
//!
//! ```toml
//! [orchestration]
//! max_concurrent_tasks = 10
//! assignment_timeout_ms = 300000
//! retry_budget = 1
//! analysis_timeout_ms = 10000
//! completion_poll_interval_ms = 100
//! failure_threshold = 0.3
//! busy_threshold = 0.8
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use swarm_application::OrchestrationParams;
use swarm_domain::{ConfigIssue, ConfigIssueCode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOrchestrationConfig {
    pub max_concurrent_tasks: usize,
    pub assignment_timeout_ms: u64,
    /// Phase re-runs allowed after an agent timeout
    pub retry_budget: u32,
    pub analysis_timeout_ms: u64,
    pub completion_poll_interval_ms: u64,
    /// Checkpoint score below which a task fails
    pub failure_threshold: f64,
    /// Busy/total ratio above which the load balancer acts
    pub busy_threshold: f64,
}

impl Default for FileOrchestrationConfig {
    fn default() -> Self {
        let params = OrchestrationParams::default();
        Self {
            max_concurrent_tasks: params.max_concurrent_tasks,
            assignment_timeout_ms: params.assignment_timeout.as_millis() as u64,
            retry_budget: params.retry_budget,
            analysis_timeout_ms: params.analysis_timeout.as_millis() as u64,
            completion_poll_interval_ms: params.completion_poll_interval.as_millis() as u64,
            failure_threshold: params.failure_threshold,
            busy_threshold: params.busy_threshold,
        }
    }
}

impl FileOrchestrationConfig {
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        let positive: [(&'static str, u64); 4] = [
            ("orchestration.max_concurrent_tasks", self.max_concurrent_tasks as u64),
            ("orchestration.assignment_timeout_ms", self.assignment_timeout_ms),
            ("orchestration.analysis_timeout_ms", self.analysis_timeout_ms),
            (
                "orchestration.completion_poll_interval_ms",
                self.completion_poll_interval_ms,
            ),
        ];
        for (key, value) in positive {
            if value == 0 {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::ZeroValue,
                    key,
                    "must be greater than zero",
                ));
            }
        }

        for (key, value) in [
            ("orchestration.failure_threshold", self.failure_threshold),
            ("orchestration.busy_threshold", self.busy_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::FractionOutOfRange,
                    key,
                    format!("{} is outside [0, 1]", value),
                ));
            }
        }

        issues
    }

    pub fn to_params(&self) -> OrchestrationParams {
        OrchestrationParams::default()
            .with_max_concurrent_tasks(self.max_concurrent_tasks)
            .with_assignment_timeout(Duration::from_millis(self.assignment_timeout_ms))
            .with_retry_budget(self.retry_budget)
            .with_analysis_timeout(Duration::from_millis(self.analysis_timeout_ms))
            .with_completion_poll_interval(Duration::from_millis(self.completion_poll_interval_ms))
            .with_failure_threshold(self.failure_threshold)
            .with_busy_threshold(self.busy_threshold)
    }
}
