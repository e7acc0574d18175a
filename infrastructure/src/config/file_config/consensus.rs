//! Consensus configuration from TOML (`[consensus]` section)
//!
//! ```toml
//! [consensus]
//! default_threshold = 0.66   # threshold of consensus-gate proposals
//! min_participation = 1.0    # share of voters needed before an early decision
//! gate_deadline_ms = 60000   # omit for gates without a deadline
//! ```

use serde::{Deserialize, Serialize};
use swarm_application::ConsensusParams;
use swarm_domain::{ConfigIssue, ConfigIssueCode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConsensusConfig {
    pub default_threshold: f64,
    pub min_participation: f64,
    pub gate_deadline_ms: Option<u64>,
}

impl Default for FileConsensusConfig {
    fn default() -> Self {
        let params = ConsensusParams::default();
        Self {
            default_threshold: params.default_threshold,
            min_participation: params.min_participation,
            gate_deadline_ms: params.gate_deadline_ms,
        }
    }
}

impl FileConsensusConfig {
    /// Both fractions must lie in `(0, 1]`
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        for (key, value) in [
            ("consensus.default_threshold", self.default_threshold),
            ("consensus.min_participation", self.min_participation),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::FractionOutOfRange,
                    key,
                    format!("{} is outside (0, 1]", value),
                ));
            }
        }
        if self.gate_deadline_ms == Some(0) {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroValue,
                "consensus.gate_deadline_ms",
                "must be greater than zero (omit it for no deadline)",
            ));
        }
        issues
    }

    pub fn to_params(&self) -> ConsensusParams {
        ConsensusParams::default()
            .with_default_threshold(self.default_threshold)
            .with_min_participation(self.min_participation)
            .with_gate_deadline_ms(self.gate_deadline_ms)
    }
}
