//! Consensus defaults applied to proposals that do not set their own.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusParams {
    /// Threshold used by the consensus gate for tasks requiring consensus.
    pub default_threshold: f64,
    /// Fraction of eligible voters that must vote before a proposal can be
    /// achieved ahead of its deadline.
    pub min_participation: f64,
    /// Deadline given to consensus-gate proposals, if any.
    pub gate_deadline_ms: Option<u64>,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            default_threshold: 0.66,
            min_participation: 1.0,
            gate_deadline_ms: Some(60_000),
        }
    }
}

impl ConsensusParams {
    pub fn with_default_threshold(mut self, threshold: f64) -> Self {
        self.default_threshold = threshold;
        self
    }

    pub fn with_min_participation(mut self, min_participation: f64) -> Self {
        self.min_participation = min_participation;
        self
    }

    pub fn with_gate_deadline_ms(mut self, deadline_ms: Option<u64>) -> Self {
        self.gate_deadline_ms = deadline_ms;
        self
    }
}
