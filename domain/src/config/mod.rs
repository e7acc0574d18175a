//! Configuration value objects for the domain layer
//!
//! These are domain concepts related to configuration that are
//! used across multiple layers.

mod output_format;
pub mod validation;

pub use output_format::{OutputFormat, ProgressStyle};
pub use validation::{ConfigIssue, ConfigIssueCode, Severity};
