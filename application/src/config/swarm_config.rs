//! Swarm configuration container.
//!
//! [`SwarmConfig`] groups the three configuration slices so the binary can
//! hand a single value to the coordinator. Use cases receive only the slice
//! they need.

use crate::config::{BackgroundIntervals, ConsensusParams, OrchestrationParams};
use swarm_domain::{ConfigIssue, ConfigIssueCode};

#[derive(Debug, Clone, Default)]
pub struct SwarmConfig {
    pub orchestration: OrchestrationParams,
    pub consensus: ConsensusParams,
    pub intervals: BackgroundIntervals,
}

impl SwarmConfig {
    pub fn new(
        orchestration: OrchestrationParams,
        consensus: ConsensusParams,
        intervals: BackgroundIntervals,
    ) -> Self {
        Self {
            orchestration,
            consensus,
            intervals,
        }
    }

    pub fn with_orchestration(mut self, orchestration: OrchestrationParams) -> Self {
        self.orchestration = orchestration;
        self
    }

    pub fn with_consensus(mut self, consensus: ConsensusParams) -> Self {
        self.consensus = consensus;
        self
    }

    pub fn with_intervals(mut self, intervals: BackgroundIntervals) -> Self {
        self.intervals = intervals;
        self
    }

    /// Cross-field checks on the converted values.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let orchestration = &self.orchestration;

        if orchestration.completion_poll_interval >= orchestration.assignment_timeout {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::PollSlowerThanTimeout,
                "orchestration.completion_poll_interval_ms",
                format!(
                    "poll interval {:?} is not shorter than the assignment timeout {:?}",
                    orchestration.completion_poll_interval, orchestration.assignment_timeout
                ),
            ));
        }

        if self.consensus.gate_deadline_ms.is_some_and(|ms| {
            std::time::Duration::from_millis(ms) < self.intervals.timeout_checker
        }) {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::CoarseTimeoutChecker,
                "intervals.timeout_checker_ms",
                "timeout checker runs less often than gate proposals expire",
            ));
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_is_valid() {
        assert!(SwarmConfig::default().validate().is_empty());
    }

    #[test]
    fn test_slow_poll_warns() {
        let config = SwarmConfig::default().with_orchestration(
            OrchestrationParams::default()
                .with_assignment_timeout(Duration::from_millis(50))
                .with_completion_poll_interval(Duration::from_millis(100)),
        );
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, ConfigIssueCode::PollSlowerThanTimeout);
        assert!(!issues[0].is_error());
    }
}
