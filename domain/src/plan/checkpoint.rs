//! Checkpoints: the quality gate evaluated after each phase.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Criterion score used when a phase produced no success rate to score against.
pub const DEFAULT_CRITERION_SCORE: f64 = 0.7;

/// Default score below which a checkpoint aborts the task.
pub const DEFAULT_FAILURE_THRESHOLD: f64 = 0.3;

/// One weighted quality criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationCriterion {
    pub name: String,
    pub weight: f64,
}

impl ValidationCriterion {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// Outcome of evaluating a checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckpointEvaluation {
    pub score: f64,
    pub passed: bool,
}

/// Quality gate for one phase
///
/// Criterion weights are normalized on construction so the weighted score
/// stays within `[0, 1]` whenever criterion scores do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub phase_index: usize,
    /// Progress percentage the task reaches once this phase passes
    pub required_progress: f64,
    criteria: Vec<ValidationCriterion>,
    pub failure_threshold: f64,
}

impl Checkpoint {
    /// Build the checkpoint for phase `phase_index` of `phase_count`.
    ///
    /// Fails when there are no criteria, a weight is negative or not finite,
    /// or all weights are zero.
    pub fn new(
        phase_index: usize,
        phase_count: usize,
        criteria: Vec<ValidationCriterion>,
        failure_threshold: f64,
    ) -> Result<Self, DomainError> {
        if criteria.is_empty() {
            return Err(DomainError::InvalidCheckpointWeights(
                "checkpoint has no criteria".to_string(),
            ));
        }
        if let Some(bad) = criteria
            .iter()
            .find(|c| !c.weight.is_finite() || c.weight < 0.0)
        {
            return Err(DomainError::InvalidCheckpointWeights(format!(
                "criterion '{}' has weight {}",
                bad.name, bad.weight
            )));
        }
        let total: f64 = criteria.iter().map(|c| c.weight).sum();
        if total <= 0.0 {
            return Err(DomainError::InvalidCheckpointWeights(
                "criterion weights sum to zero".to_string(),
            ));
        }

        let criteria = criteria
            .into_iter()
            .map(|c| ValidationCriterion::new(c.name, c.weight / total))
            .collect();
        let phase_count = phase_count.max(1);

        Ok(Self {
            phase_index,
            required_progress: (phase_index + 1) as f64 / phase_count as f64 * 100.0,
            criteria,
            failure_threshold,
        })
    }

    pub fn criteria(&self) -> &[ValidationCriterion] {
        &self.criteria
    }

    /// Score the phase.
    ///
    /// Every criterion is scored with the phase success rate when one exists,
    /// otherwise with [`DEFAULT_CRITERION_SCORE`].
    pub fn evaluate(&self, success_rate: Option<f64>) -> CheckpointEvaluation {
        let criterion_score = success_rate.unwrap_or(DEFAULT_CRITERION_SCORE);
        let score: f64 = self
            .criteria
            .iter()
            .map(|c| c.weight * criterion_score)
            .sum();
        CheckpointEvaluation {
            score,
            passed: score >= self.failure_threshold,
        }
    }
}
