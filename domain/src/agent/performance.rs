//! Historical agent performance used to rank assignment candidates.

use crate::core::ids::AgentId;
use serde::{Deserialize, Serialize};

/// Success rate assumed for agents without any recorded history.
pub const DEFAULT_SUCCESS_RATE: f64 = 0.5;

/// Per-agent completion counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPerformance {
    pub agent_id: AgentId,
    /// Assignments that finished with a truthy success flag
    pub succeeded: u64,
    /// All assignments dispatched to the agent, including timeouts
    pub completed: u64,
}

impl AgentPerformance {
    pub fn new(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            succeeded: 0,
            completed: 0,
        }
    }

    /// Seed a record with existing counters.
    pub fn with_history(agent_id: AgentId, succeeded: u64, completed: u64) -> Self {
        Self {
            agent_id,
            succeeded: succeeded.min(completed),
            completed,
        }
    }

    pub fn record(&mut self, success: bool) {
        self.completed += 1;
        if success {
            self.succeeded += 1;
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.completed == 0 {
            DEFAULT_SUCCESS_RATE
        } else {
            self.succeeded as f64 / self.completed as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history_uses_default_rate() {
        let perf = AgentPerformance::new(AgentId::new("a"));
        assert_eq!(perf.success_rate(), DEFAULT_SUCCESS_RATE);
    }

    #[test]
    fn test_record_updates_rate() {
        let mut perf = AgentPerformance::new(AgentId::new("a"));
        perf.record(true);
        perf.record(true);
        perf.record(false);
        perf.record(true);
        assert_eq!(perf.success_rate(), 0.75);
    }

    #[test]
    fn test_with_history_clamps_successes() {
        let perf = AgentPerformance::with_history(AgentId::new("a"), 12, 10);
        assert_eq!(perf.success_rate(), 1.0);
    }
}
