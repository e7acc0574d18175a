//! Output format value object

use serde::{Deserialize, Serialize};

/// How execution reports and proposal snapshots are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Coloured, human-readable summary (default)
    #[default]
    Text,
    /// Pretty-printed JSON of the stored records
    Json,
}

/// How task progress is shown while a command runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStyle {
    /// Live progress bars per task (default)
    #[default]
    Bars,
    /// One printed line per event, for logs and non-interactive terminals
    Plain,
    /// Nothing
    Off,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}. Valid: text, json", s)),
        }
    }
}
