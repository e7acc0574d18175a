//! Task entities

use crate::agent::entities::Capabilities;
use crate::core::ids::{AgentId, SwarmId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Submitted and waiting for a free execution slot
    #[default]
    Queued,
    /// Waiting for a consensus proposal to approve execution
    AwaitingConsensus,
    /// Phases are being executed
    Executing,
    /// All phases passed their checkpoints
    Completed,
    /// A checkpoint or agent timeout stopped execution
    Failed,
    /// Cancelled by a caller or a consensus decision
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::AwaitingConsensus => "awaiting_consensus",
            TaskStatus::Executing => "executing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scheduling priority of a task
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Critical => "critical",
        }
    }
}

impl std::str::FromStr for TaskPriority {
    type Err = crate::core::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "medium" | "normal" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            "critical" => Ok(TaskPriority::Critical),
            other => Err(crate::core::error::DomainError::InvalidValue {
                field: "priority".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Declared execution strategy of a task
///
/// Unknown names survive deserialization as [`TaskStrategy::Unrecognized`] so
/// the planner can fall back to `adaptive` and say so, instead of rejecting
/// the whole submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStrategy {
    Parallel,
    Sequential,
    #[default]
    Adaptive,
    Consensus,
    Unrecognized(String),
}

impl TaskStrategy {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStrategy::Parallel => "parallel",
            TaskStrategy::Sequential => "sequential",
            TaskStrategy::Adaptive => "adaptive",
            TaskStrategy::Consensus => "consensus",
            TaskStrategy::Unrecognized(name) => name,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, TaskStrategy::Unrecognized(_))
    }
}

impl From<String> for TaskStrategy {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "parallel" => TaskStrategy::Parallel,
            "sequential" => TaskStrategy::Sequential,
            "adaptive" => TaskStrategy::Adaptive,
            "consensus" => TaskStrategy::Consensus,
            _ => TaskStrategy::Unrecognized(s),
        }
    }
}

impl From<&str> for TaskStrategy {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<TaskStrategy> for String {
    fn from(strategy: TaskStrategy) -> Self {
        strategy.as_str().to_string()
    }
}

impl fmt::Display for TaskStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit of work submitted to the swarm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Swarm whose agents may work on (and vote about) this task
    pub swarm_id: SwarmId,
    /// Free-text description of the work
    pub description: String,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub strategy: TaskStrategy,
    /// Tasks that must be completed before this one may start
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
    /// Capabilities every assignment of this task requires
    #[serde(default)]
    pub required_capabilities: Capabilities,
    /// Upper bound on agents working on the task at once
    #[serde(default = "default_max_agents")]
    pub max_agents: usize,
    /// Whether a consensus proposal must approve the task before it runs
    #[serde(default)]
    pub requires_consensus: bool,

    // Fields below are owned by the Task Supervisor.
    #[serde(default)]
    pub status: TaskStatus,
    /// Completion percentage (0-100)
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub assigned_agents: Vec<AgentId>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

fn default_max_agents() -> usize {
    3
}

impl Task {
    pub fn new(
        id: impl Into<TaskId>,
        swarm_id: impl Into<SwarmId>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            swarm_id: swarm_id.into(),
            description: description.into(),
            priority: TaskPriority::default(),
            strategy: TaskStrategy::default(),
            dependencies: Vec::new(),
            required_capabilities: Capabilities::default(),
            max_agents: default_max_agents(),
            requires_consensus: false,
            status: TaskStatus::Queued,
            progress: 0.0,
            assigned_agents: Vec::new(),
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn with_strategy(mut self, strategy: impl Into<TaskStrategy>) -> Self {
        self.strategy = strategy.into();
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.required_capabilities.insert(capability.into());
        self
    }

    pub fn with_dependency(mut self, task_id: impl Into<TaskId>) -> Self {
        self.dependencies.push(task_id.into());
        self
    }

    pub fn with_max_agents(mut self, max_agents: usize) -> Self {
        self.max_agents = max_agents.max(1);
        self
    }

    pub fn with_consensus(mut self) -> Self {
        self.requires_consensus = true;
        self
    }

    /// Adds an agent to the assigned list unless it is already there.
    ///
    /// Returns `true` when the list changed.
    pub fn assign_agent(&mut self, agent_id: &AgentId) -> bool {
        if self.assigned_agents.contains(agent_id) {
            return false;
        }
        self.assigned_agents.push(agent_id.clone());
        true
    }

    pub fn mark_executing(&mut self) {
        self.status = TaskStatus::Executing;
        self.started_at = Some(Utc::now());
        self.error = None;
    }

    pub fn mark_completed(&mut self, result: serde_json::Value) {
        self.status = TaskStatus::Completed;
        self.progress = 100.0;
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = TaskStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }

    pub fn mark_cancelled(&mut self, reason: Option<String>) {
        self.status = TaskStatus::Cancelled;
        self.error = reason;
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_builder() {
        let task = Task::new("t1", "swarm-a", "Build the thing")
            .with_strategy("sequential")
            .with_capability("rust")
            .with_dependency("t0")
            .with_consensus();

        assert_eq!(task.strategy, TaskStrategy::Sequential);
        assert!(task.required_capabilities.contains("rust"));
        assert_eq!(task.dependencies, vec![TaskId::new("t0")]);
        assert!(task.requires_consensus);
        assert_eq!(task.status, TaskStatus::Queued);
    }

    #[test]
    fn test_unknown_strategy_is_preserved() {
        let strategy = TaskStrategy::from("swarm-magic");
        assert_eq!(strategy, TaskStrategy::Unrecognized("swarm-magic".to_string()));
        assert!(!strategy.is_recognized());
        assert_eq!(strategy.to_string(), "swarm-magic");
    }

    #[test]
    fn test_task_deserializes_with_defaults() {
        let task: Task = serde_json::from_str(
            r#"{"id":"t9","swarm_id":"s","description":"d","strategy":"Parallel"}"#,
        )
        .unwrap();
        assert_eq!(task.strategy, TaskStrategy::Parallel);
        assert_eq!(task.max_agents, 3);
        assert_eq!(task.status, TaskStatus::Queued);
        assert!(task.required_capabilities.is_empty());
    }

    #[test]
    fn test_assign_agent_is_idempotent() {
        let mut task = Task::new("t1", "s", "d");
        let agent = AgentId::new("a1");
        assert!(task.assign_agent(&agent));
        assert!(!task.assign_agent(&agent));
        assert_eq!(task.assigned_agents.len(), 1);
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Executing.is_terminal());
        assert!(!TaskStatus::AwaitingConsensus.is_terminal());
    }

    #[test]
    fn test_mark_completed_sets_progress() {
        let mut task = Task::new("t1", "s", "d");
        task.mark_executing();
        task.mark_completed(serde_json::json!({"ok": true}));
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.progress, 100.0);
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn test_priority_ordering_and_parse() {
        assert!(TaskPriority::Critical > TaskPriority::Low);
        assert_eq!("HIGH".parse::<TaskPriority>().unwrap(), TaskPriority::High);
        assert!("urgent".parse::<TaskPriority>().is_err());
    }
}
