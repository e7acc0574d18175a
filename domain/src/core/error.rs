//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid consensus threshold {0}: must lie in (0, 1]")]
    InvalidThreshold(f64),

    #[error("Invalid minimum participation {0}: must lie in (0, 1]")]
    InvalidParticipation(f64),

    #[error("Invalid checkpoint weights: {0}")]
    InvalidCheckpointWeights(String),

    #[error("Unknown phase kind: {0}")]
    UnknownPhase(String),

    #[error("Unknown task strategy: {0}")]
    UnknownStrategy(String),

    #[error("Unknown agent role: {0}")]
    UnknownRole(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

impl DomainError {
    /// Check if this error was caused by an unrecognised enum name
    pub fn is_unknown_name(&self) -> bool {
        matches!(
            self,
            DomainError::UnknownPhase(_)
                | DomainError::UnknownStrategy(_)
                | DomainError::UnknownRole(_)
        )
    }
}
