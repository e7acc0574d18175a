//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into the application's
//! [`SwarmConfig`] once validated.

mod consensus;
mod intervals;
mod logging;
mod orchestration;
mod output;

pub use consensus::FileConsensusConfig;
pub use intervals::FileIntervalsConfig;
pub use logging::FileLoggingConfig;
pub use orchestration::FileOrchestrationConfig;
pub use output::FileOutputConfig;

use serde::{Deserialize, Serialize};
use swarm_application::SwarmConfig;
use swarm_domain::ConfigIssue;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Task pool, timeouts and retries
    pub orchestration: FileOrchestrationConfig,
    /// Proposal defaults
    pub consensus: FileConsensusConfig,
    /// Background loop periods
    pub intervals: FileIntervalsConfig,
    /// Log level and sinks
    pub logging: FileLoggingConfig,
    /// Output settings
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Section checks run first; cross-field checks only run on a config
    /// whose sections are individually sound.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        issues.extend(self.orchestration.validate());
        issues.extend(self.consensus.validate());
        issues.extend(self.intervals.validate());
        issues.extend(self.logging.validate());

        if !issues.iter().any(|i| i.is_error()) {
            issues.extend(self.to_swarm_config().validate());
        }
        issues
    }

    pub fn to_swarm_config(&self) -> SwarmConfig {
        SwarmConfig::new(
            self.orchestration.to_params(),
            self.consensus.to_params(),
            self.intervals.to_intervals(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use swarm_domain::{ConfigIssueCode, OutputFormat};

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[orchestration]
max_concurrent_tasks = 4
assignment_timeout_ms = 1000
retry_budget = 0

[consensus]
default_threshold = 1.0

[intervals]
task_distributor_ms = 250

[logging]
level = "debug"

[output]
format = "json"
color = false
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_empty());

        let swarm = config.to_swarm_config();
        assert_eq!(swarm.orchestration.max_concurrent_tasks, 4);
        assert_eq!(swarm.orchestration.assignment_timeout, Duration::from_secs(1));
        assert_eq!(swarm.orchestration.retry_budget, 0);
        assert_eq!(swarm.consensus.default_threshold, 1.0);
        assert_eq!(swarm.intervals.task_distributor, Duration::from_millis(250));
        assert_eq!(config.logging.level(), "debug");
        assert_eq!(config.output.format, Some(OutputFormat::Json));
        assert!(!config.output.color);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let toml_str = r#"
[consensus]
min_participation = 0.5
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.consensus.min_participation, 0.5);
        // Defaults should apply
        assert_eq!(config.orchestration, FileOrchestrationConfig::default());
        assert!(config.output.color);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = FileConfig::default();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_cross_field_warning() {
        let toml_str = r#"
[orchestration]
assignment_timeout_ms = 100
completion_poll_interval_ms = 200
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let issues = config.validate();
        assert!(
            issues
                .iter()
                .any(|i| i.code == ConfigIssueCode::PollSlowerThanTimeout)
        );
        assert!(issues.iter().all(|i| !i.is_error()));
    }
}
