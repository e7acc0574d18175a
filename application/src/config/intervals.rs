//! Tick intervals of the background processes.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundIntervals {
    pub task_distributor: Duration,
    pub progress_monitor: Duration,
    pub load_balancer: Duration,
    pub proposal_monitor: Duration,
    pub timeout_checker: Duration,
    pub metrics_collector: Duration,
}

impl Default for BackgroundIntervals {
    fn default() -> Self {
        Self {
            task_distributor: Duration::from_secs(5),
            progress_monitor: Duration::from_secs(2),
            load_balancer: Duration::from_secs(30),
            proposal_monitor: Duration::from_secs(5),
            timeout_checker: Duration::from_secs(1),
            metrics_collector: Duration::from_secs(60),
        }
    }
}

impl BackgroundIntervals {
    /// Every interval set to `interval`; convenient for tests and demos.
    pub fn uniform(interval: Duration) -> Self {
        Self {
            task_distributor: interval,
            progress_monitor: interval,
            load_balancer: interval,
            proposal_monitor: interval,
            timeout_checker: interval,
            metrics_collector: interval,
        }
    }
}
