//! Rolling consensus statistics

use super::evaluation::ConsensusResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate counters over resolved proposals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusMetrics {
    pub achieved: u64,
    pub failed: u64,
    pub average_participation: f64,
    pub average_duration_ms: f64,
    pub updated_at: DateTime<Utc>,
}

impl Default for ConsensusMetrics {
    fn default() -> Self {
        Self {
            achieved: 0,
            failed: 0,
            average_participation: 0.0,
            average_duration_ms: 0.0,
            updated_at: Utc::now(),
        }
    }
}

impl ConsensusMetrics {
    pub fn resolved(&self) -> u64 {
        self.achieved + self.failed
    }

    pub fn achievement_rate(&self) -> Option<f64> {
        match self.resolved() {
            0 => None,
            n => Some(self.achieved as f64 / n as f64),
        }
    }

    /// Fold one resolution into the running averages.
    pub fn record(&mut self, result: &ConsensusResult, duration_ms: u64) {
        if result.achieved {
            self.achieved += 1;
        } else {
            self.failed += 1;
        }
        let n = self.resolved() as f64;
        self.average_participation += (result.participation_rate - self.average_participation) / n;
        self.average_duration_ms += (duration_ms as f64 - self.average_duration_ms) / n;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::evaluation::ResolutionReason;
    use crate::core::ids::ProposalId;

    fn result(achieved: bool, participation_rate: f64) -> ConsensusResult {
        ConsensusResult {
            proposal_id: ProposalId::new("p"),
            achieved,
            ratio: 0.0,
            positive_votes: 0,
            negative_votes: 0,
            total_votes: 0,
            eligible_voters: 3,
            participation_rate,
            reason: ResolutionReason::AllVoted,
        }
    }

    #[test]
    fn test_rolling_averages() {
        let mut metrics = ConsensusMetrics::default();
        assert_eq!(metrics.achievement_rate(), None);

        metrics.record(&result(true, 1.0), 100);
        metrics.record(&result(false, 0.0), 300);

        assert_eq!(metrics.achieved, 1);
        assert_eq!(metrics.failed, 1);
        assert!((metrics.average_participation - 0.5).abs() < 1e-9);
        assert!((metrics.average_duration_ms - 200.0).abs() < 1e-9);
        assert_eq!(metrics.achievement_rate(), Some(0.5));
    }
}
