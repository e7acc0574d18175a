//! Orchestration parameters — task pool, timeouts and retry budget.
//!
//! [`OrchestrationParams`] groups the static parameters that control how the
//! planner, phase executor and task supervisor behave. These are
//! application-layer concerns, not domain policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use swarm_domain::plan::checkpoint::DEFAULT_FAILURE_THRESHOLD;

/// Task execution control parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationParams {
    /// Maximum number of tasks executing at once.
    pub max_concurrent_tasks: usize,
    /// Time an agent gets to finish one assignment.
    pub assignment_timeout: Duration,
    /// How many times a phase is re-run after an agent timeout.
    pub retry_budget: u32,
    /// Upper bound on one analysis service call.
    pub analysis_timeout: Duration,
    /// How often a dispatched agent is checked for completion.
    pub completion_poll_interval: Duration,
    /// Checkpoint score below which a task fails.
    pub failure_threshold: f64,
    /// Busy/total ratio above which the rebalancer acts.
    pub busy_threshold: f64,
}

impl Default for OrchestrationParams {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 10,
            assignment_timeout: Duration::from_secs(300),
            retry_budget: 1,
            analysis_timeout: Duration::from_secs(10),
            completion_poll_interval: Duration::from_millis(100),
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            busy_threshold: 0.8,
        }
    }
}

impl OrchestrationParams {
    // ==================== Builder Methods ====================

    pub fn with_max_concurrent_tasks(mut self, max: usize) -> Self {
        self.max_concurrent_tasks = max;
        self
    }

    pub fn with_assignment_timeout(mut self, timeout: Duration) -> Self {
        self.assignment_timeout = timeout;
        self
    }

    pub fn with_retry_budget(mut self, retries: u32) -> Self {
        self.retry_budget = retries;
        self
    }

    pub fn with_analysis_timeout(mut self, timeout: Duration) -> Self {
        self.analysis_timeout = timeout;
        self
    }

    pub fn with_completion_poll_interval(mut self, interval: Duration) -> Self {
        self.completion_poll_interval = interval;
        self
    }

    pub fn with_failure_threshold(mut self, threshold: f64) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_busy_threshold(mut self, threshold: f64) -> Self {
        self.busy_threshold = threshold;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = OrchestrationParams::default();
        assert_eq!(params.max_concurrent_tasks, 10);
        assert_eq!(params.retry_budget, 1);
        assert_eq!(params.failure_threshold, 0.3);
        assert_eq!(params.busy_threshold, 0.8);
    }

    #[test]
    fn test_builder() {
        let params = OrchestrationParams::default()
            .with_max_concurrent_tasks(2)
            .with_assignment_timeout(Duration::from_millis(1000))
            .with_retry_budget(0);

        assert_eq!(params.max_concurrent_tasks, 2);
        assert_eq!(params.assignment_timeout, Duration::from_secs(1));
        assert_eq!(params.retry_budget, 0);
    }
}
