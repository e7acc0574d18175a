//! Presentation-level configuration
//!
//! Output format, colour and progress display, resolved from the config file
//! and CLI flags.

use crate::progress::reporter::{ProgressReporter, SimpleProgress};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use swarm_application::{NoProgress, ProgressNotifier};
use swarm_domain::{OutputFormat, ProgressStyle};

/// Output configuration for the presentation layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Enable colored terminal output
    pub color: bool,
    pub progress: ProgressStyle,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: true,
            progress: ProgressStyle::Bars,
        }
    }
}

impl OutputConfig {
    pub fn new(format: OutputFormat, color: bool) -> Self {
        Self {
            format,
            color,
            progress: ProgressStyle::Bars,
        }
    }

    pub fn with_progress(mut self, progress: ProgressStyle) -> Self {
        self.progress = progress;
        self
    }

    /// Progress display in effect: off under `--quiet` or JSON output.
    pub fn effective_progress(&self, quiet: bool) -> ProgressStyle {
        if quiet || self.format == OutputFormat::Json {
            ProgressStyle::Off
        } else {
            self.progress
        }
    }

    pub fn progress_notifier(&self, quiet: bool) -> Arc<dyn ProgressNotifier> {
        match self.effective_progress(quiet) {
            ProgressStyle::Bars => Arc::new(ProgressReporter::new()),
            ProgressStyle::Plain => Arc::new(SimpleProgress),
            ProgressStyle::Off => Arc::new(NoProgress),
        }
    }

    /// CLI flag wins over the configured format
    pub fn with_format_override(mut self, format: Option<OutputFormat>) -> Self {
        if let Some(format) = format {
            self.format = format;
        }
        self
    }

    /// Apply the colour setting process-wide. JSON output is never coloured.
    pub fn apply(&self) {
        if !self.color || self.format == OutputFormat::Json {
            colored::control::set_override(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_overrides_file() {
        let config = OutputConfig::new(OutputFormat::Text, true)
            .with_format_override(Some(OutputFormat::Json));
        assert_eq!(config.format, OutputFormat::Json);

        let config = OutputConfig::default().with_format_override(None);
        assert_eq!(config.format, OutputFormat::Text);
    }

    #[test]
    fn test_effective_progress() {
        let plain = OutputConfig::default().with_progress(ProgressStyle::Plain);
        assert_eq!(plain.effective_progress(false), ProgressStyle::Plain);
        assert_eq!(plain.effective_progress(true), ProgressStyle::Off);

        let json = plain.with_format_override(Some(OutputFormat::Json));
        assert_eq!(json.effective_progress(false), ProgressStyle::Off);

        assert_eq!(OutputConfig::default().effective_progress(false), ProgressStyle::Bars);
    }
}
