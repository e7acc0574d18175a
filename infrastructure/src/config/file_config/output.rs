//! `[output]` section: rendering format, colour and progress display

use serde::{Deserialize, Serialize};
use swarm_domain::{OutputFormat, ProgressStyle};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// `None` leaves the choice to the `--format` flag
    pub format: Option<OutputFormat>,
    pub color: bool,
    /// `bars`, `plain` or `off`
    pub progress: ProgressStyle,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
            progress: ProgressStyle::Bars,
        }
    }
}
