//! Background loop intervals from TOML (`[intervals]` section)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use swarm_application::BackgroundIntervals;
use swarm_domain::{ConfigIssue, ConfigIssueCode};

/// Tick periods in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileIntervalsConfig {
    pub task_distributor_ms: u64,
    pub progress_monitor_ms: u64,
    pub load_balancer_ms: u64,
    pub proposal_monitor_ms: u64,
    pub timeout_checker_ms: u64,
    pub metrics_collector_ms: u64,
}

impl Default for FileIntervalsConfig {
    fn default() -> Self {
        let intervals = BackgroundIntervals::default();
        let ms = |d: Duration| d.as_millis() as u64;
        Self {
            task_distributor_ms: ms(intervals.task_distributor),
            progress_monitor_ms: ms(intervals.progress_monitor),
            load_balancer_ms: ms(intervals.load_balancer),
            proposal_monitor_ms: ms(intervals.proposal_monitor),
            timeout_checker_ms: ms(intervals.timeout_checker),
            metrics_collector_ms: ms(intervals.metrics_collector),
        }
    }
}

impl FileIntervalsConfig {
    fn entries(&self) -> [(&'static str, u64); 6] {
        [
            ("intervals.task_distributor_ms", self.task_distributor_ms),
            ("intervals.progress_monitor_ms", self.progress_monitor_ms),
            ("intervals.load_balancer_ms", self.load_balancer_ms),
            ("intervals.proposal_monitor_ms", self.proposal_monitor_ms),
            ("intervals.timeout_checker_ms", self.timeout_checker_ms),
            ("intervals.metrics_collector_ms", self.metrics_collector_ms),
        ]
    }

    /// A zero period would make `tokio::time::interval` panic
    pub fn validate(&self) -> Vec<ConfigIssue> {
        self.entries()
            .into_iter()
            .filter(|(_, value)| *value == 0)
            .map(|(key, _)| {
                ConfigIssue::error(ConfigIssueCode::ZeroValue, key, "interval must be positive")
            })
            .collect()
    }

    pub fn to_intervals(&self) -> BackgroundIntervals {
        BackgroundIntervals {
            task_distributor: Duration::from_millis(self.task_distributor_ms),
            progress_monitor: Duration::from_millis(self.progress_monitor_ms),
            load_balancer: Duration::from_millis(self.load_balancer_ms),
            proposal_monitor: Duration::from_millis(self.proposal_monitor_ms),
            timeout_checker: Duration::from_millis(self.timeout_checker_ms),
            metrics_collector: Duration::from_millis(self.metrics_collector_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_periods() {
        let intervals = FileIntervalsConfig::default().to_intervals();
        assert_eq!(intervals.task_distributor, Duration::from_secs(5));
        assert_eq!(intervals.timeout_checker, Duration::from_secs(1));
        assert_eq!(intervals.metrics_collector, Duration::from_secs(60));
    }

    #[test]
    fn test_zero_interval_is_an_error() {
        let config = FileIntervalsConfig {
            load_balancer_ms: 0,
            ..Default::default()
        };
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].key, "intervals.load_balancer_ms");
    }
}
