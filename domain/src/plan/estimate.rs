//! Complexity and resource estimates returned by the analysis service.

use crate::agent::entities::Capabilities;
use crate::core::ids::TaskId;
use crate::task::entities::{Task, TaskPriority, TaskStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse complexity classification of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Agent-count bounds for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    pub min_agents: usize,
    pub max_agents: usize,
}

impl Default for ResourceRequirements {
    fn default() -> Self {
        Self {
            min_agents: 1,
            max_agents: 3,
        }
    }
}

/// Complexity classification with duration and resource estimates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityEstimate {
    pub complexity: Complexity,
    pub estimated_duration_ms: u64,
    pub resources: ResourceRequirements,
    /// `true` when the analysis service was unavailable and defaults were used
    #[serde(default)]
    pub degraded: bool,
}

impl ComplexityEstimate {
    pub const DEFAULT_DURATION_MS: u64 = 300_000;

    /// Medium complexity with default resource bounds.
    pub fn fallback() -> Self {
        Self {
            complexity: Complexity::Medium,
            estimated_duration_ms: Self::DEFAULT_DURATION_MS,
            resources: ResourceRequirements::default(),
            degraded: true,
        }
    }
}

/// Description and metadata handed to the analysis service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAnalysisRequest {
    pub task_id: TaskId,
    pub description: String,
    pub strategy: TaskStrategy,
    pub priority: TaskPriority,
    pub required_capabilities: Capabilities,
    pub dependency_count: usize,
    pub max_agents: usize,
}

impl From<&Task> for TaskAnalysisRequest {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            description: task.description.clone(),
            strategy: task.strategy.clone(),
            priority: task.priority,
            required_capabilities: task.required_capabilities.clone(),
            dependency_count: task.dependencies.len(),
            max_agents: task.max_agents,
        }
    }
}
