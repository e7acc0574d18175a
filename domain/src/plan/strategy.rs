//! Strategy descriptors: how a declared task strategy shapes the plan.

use super::estimate::{Complexity, ResourceRequirements};
use super::phase::PhaseKind;
use crate::task::entities::{Task, TaskStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A strategy the planner knows how to build a plan for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Parallel,
    Sequential,
    Adaptive,
    Consensus,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Parallel => "parallel",
            StrategyKind::Sequential => "sequential",
            StrategyKind::Adaptive => "adaptive",
            StrategyKind::Consensus => "consensus",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Phase layout, parallelism and concurrency for one strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyDescriptor {
    pub kind: StrategyKind,
}

impl StrategyDescriptor {
    /// Look up the descriptor for a declared strategy.
    ///
    /// Unrecognized names resolve to `adaptive`; the second element is
    /// `true` in that case so the caller can report the fallback.
    pub fn resolve(strategy: &TaskStrategy) -> (Self, bool) {
        let kind = match strategy {
            TaskStrategy::Parallel => StrategyKind::Parallel,
            TaskStrategy::Sequential => StrategyKind::Sequential,
            TaskStrategy::Adaptive => StrategyKind::Adaptive,
            TaskStrategy::Consensus => StrategyKind::Consensus,
            TaskStrategy::Unrecognized(_) => {
                return (
                    Self {
                        kind: StrategyKind::Adaptive,
                    },
                    true,
                );
            }
        };
        (Self { kind }, false)
    }

    /// Ordered phases for a task of the given complexity
    pub fn phases(&self, _task: &Task, complexity: Complexity) -> Vec<PhaseKind> {
        use PhaseKind::*;
        match self.kind {
            StrategyKind::Sequential => vec![Analysis, Planning, Execution, Validation],
            StrategyKind::Parallel => vec![Analysis, ParallelExecution, Integration],
            StrategyKind::Consensus => vec![Analysis, Proposal, Voting, Execution, Validation],
            StrategyKind::Adaptive => match complexity {
                Complexity::Low => vec![Execution, Validation],
                Complexity::Medium => vec![Analysis, Execution, Validation],
                Complexity::High => vec![
                    Analysis,
                    Planning,
                    ParallelExecution,
                    Integration,
                    Validation,
                ],
            },
        }
    }

    pub fn is_parallelizable(&self, complexity: Complexity) -> bool {
        match self.kind {
            StrategyKind::Parallel => true,
            StrategyKind::Adaptive => complexity == Complexity::High,
            StrategyKind::Sequential | StrategyKind::Consensus => false,
        }
    }

    /// Upper bound on agents working the task at once
    pub fn max_concurrency(&self, task: &Task, resources: &ResourceRequirements) -> usize {
        let cap = task.max_agents.min(resources.max_agents).max(1);
        match self.kind {
            StrategyKind::Parallel | StrategyKind::Adaptive => cap,
            StrategyKind::Sequential | StrategyKind::Consensus => 1,
        }
    }
}
