//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use swarm_domain::{ConfigIssue, ConfigIssueCode};

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Default filter when `RUST_LOG` and `-v` are absent
    pub level: String,
    /// Directory for daily rolling log files
    pub directory: Option<PathBuf>,
    /// Record every bus event to this JSONL file
    pub events_jsonl: Option<PathBuf>,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            events_jsonl: None,
        }
    }
}

impl FileLoggingConfig {
    pub fn validate(&self) -> Vec<ConfigIssue> {
        if LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Vec::new();
        }
        vec![ConfigIssue::warning(
            ConfigIssueCode::UnknownLogLevel,
            "logging.level",
            format!(
                "unknown level '{}', falling back to 'info' (valid: {})",
                self.level,
                LEVELS.join(", ")
            ),
        )]
    }

    /// The configured level, or `info` when it is not recognised
    pub fn level(&self) -> &str {
        let level = self.level.as_str();
        if LEVELS.iter().any(|l| l.eq_ignore_ascii_case(level)) {
            level
        } else {
            "info"
        }
    }
}
