//! Agent entities

use crate::core::ids::{AgentId, SwarmId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A set of named skills.
///
/// Ordered so that serialized records and log output are stable.
pub type Capabilities = BTreeSet<String>;

/// Availability of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Idle,
    Busy,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Busy => "busy",
        }
    }
}

/// What an agent reports when it finishes an assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    /// Task the result belongs to
    pub task_id: TaskId,
    pub success: bool,
    #[serde(default)]
    pub output: serde_json::Value,
    #[serde(default)]
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
    /// Dispatch number of the claim this result answers; 0 until stamped
    #[serde(default)]
    pub dispatch: u64,
}

impl AgentResult {
    pub fn success(task_id: TaskId, output: serde_json::Value) -> Self {
        Self {
            task_id,
            success: true,
            output,
            error: None,
            completed_at: Utc::now(),
            dispatch: 0,
        }
    }

    pub fn failure(task_id: TaskId, error: impl Into<String>) -> Self {
        Self {
            task_id,
            success: false,
            output: serde_json::Value::Null,
            error: Some(error.into()),
            completed_at: Utc::now(),
            dispatch: 0,
        }
    }

    /// Answer a specific claim, as read from the assignment brief.
    pub fn with_dispatch(mut self, dispatch: u64) -> Self {
        self.dispatch = dispatch;
        self
    }
}

/// The assignment-facing view of an external agent
///
/// # Invariant
///
/// `status == Busy` exactly when `current_task` is `Some`. Only
/// [`attach`](Self::attach) and [`detach`](Self::detach) change either field.
///
/// Every claim bumps `dispatch`, so a result can be matched to the claim it
/// answers even when the agent takes the same task again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentId,
    pub swarm_id: SwarmId,
    /// Free-form type label ("coder", "reviewer", ...), used for vote advice
    pub agent_type: String,
    pub capabilities: Capabilities,
    status: AgentStatus,
    current_task: Option<TaskId>,
    #[serde(default)]
    dispatch: u64,
    /// Result slot the agent fills when it finishes an assignment
    #[serde(default)]
    pub last_result: Option<AgentResult>,
}

impl AgentRecord {
    pub fn new(
        id: impl Into<AgentId>,
        swarm_id: impl Into<SwarmId>,
        agent_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            swarm_id: swarm_id.into(),
            agent_type: agent_type.into(),
            capabilities: Capabilities::new(),
            status: AgentStatus::Idle,
            current_task: None,
            dispatch: 0,
            last_result: None,
        }
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities
            .extend(capabilities.into_iter().map(Into::into));
        self
    }

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    pub fn current_task(&self) -> Option<&TaskId> {
        self.current_task.as_ref()
    }

    /// Number of the latest claim on this agent
    pub fn dispatch(&self) -> u64 {
        self.dispatch
    }

    pub fn is_idle(&self) -> bool {
        self.status == AgentStatus::Idle
    }

    /// Whether this agent currently holds the given task
    pub fn holds(&self, task_id: &TaskId) -> bool {
        self.current_task.as_ref() == Some(task_id)
    }

    /// Superset match: every required capability must be declared.
    pub fn can_fulfil(&self, required: &Capabilities) -> bool {
        required.is_subset(&self.capabilities)
    }

    /// Point the agent at a task and mark it busy.
    ///
    /// Returns the dispatch number of this claim.
    pub fn attach(&mut self, task_id: TaskId) -> u64 {
        self.dispatch += 1;
        self.current_task = Some(task_id);
        self.status = AgentStatus::Busy;
        self.dispatch
    }

    /// Whether `result` answers the claim the agent currently holds
    pub fn accepts(&self, result: &AgentResult) -> bool {
        self.holds(&result.task_id) && (result.dispatch == 0 || result.dispatch == self.dispatch)
    }

    /// Clear the task pointer and mark the agent idle.
    ///
    /// Returns the task the agent was holding, if any.
    pub fn detach(&mut self) -> Option<TaskId> {
        self.status = AgentStatus::Idle;
        self.current_task.take()
    }

    /// Record a finished assignment and release the agent.
    ///
    /// An unstamped result is stamped with the current dispatch number.
    pub fn complete(&mut self, mut result: AgentResult) {
        if result.dispatch == 0 {
            result.dispatch = self.dispatch;
        }
        self.last_result = Some(result);
        self.detach();
    }

    /// Checks the busy-iff-pointer invariant.
    pub fn is_consistent(&self) -> bool {
        (self.status == AgentStatus::Busy) == self.current_task.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> AgentRecord {
        AgentRecord::new("a1", "swarm", "coder").with_capabilities(["rust", "test"])
    }

    #[test]
    fn test_attach_and_detach_keep_invariant() {
        let mut a = agent();
        assert!(a.is_idle());
        assert!(a.is_consistent());

        a.attach(TaskId::new("t1"));
        assert_eq!(a.status(), AgentStatus::Busy);
        assert!(a.holds(&TaskId::new("t1")));
        assert!(a.is_consistent());

        assert_eq!(a.detach(), Some(TaskId::new("t1")));
        assert!(a.is_idle());
        assert!(a.current_task().is_none());
        assert!(a.is_consistent());
    }

    #[test]
    fn test_capability_superset_match() {
        let a = agent();
        let mut required = Capabilities::new();
        assert!(a.can_fulfil(&required));
        required.insert("rust".to_string());
        assert!(a.can_fulfil(&required));
        required.insert("python".to_string());
        assert!(!a.can_fulfil(&required));
    }

    #[test]
    fn test_complete_stores_result_and_releases() {
        let mut a = agent();
        a.attach(TaskId::new("t1"));
        a.complete(AgentResult::success(
            TaskId::new("t1"),
            serde_json::json!({"lines": 10}),
        ));
        assert!(a.is_idle());
        assert!(a.last_result.as_ref().is_some_and(|r| r.success));
    }

    #[test]
    fn test_each_claim_gets_a_new_dispatch() {
        let mut a = agent();
        let first = a.attach(TaskId::new("t1"));
        a.complete(AgentResult::success(TaskId::new("t1"), serde_json::json!(null)));
        assert_eq!(a.last_result.as_ref().map(|r| r.dispatch), Some(first));

        let second = a.attach(TaskId::new("t1"));
        assert!(second > first);
        // the previous claim's result is still readable but answers an older claim
        assert_eq!(a.last_result.as_ref().map(|r| r.dispatch), Some(first));

        let stale = AgentResult::success(TaskId::new("t1"), serde_json::json!(null))
            .with_dispatch(first);
        assert!(!a.accepts(&stale));
        let current = AgentResult::success(TaskId::new("t1"), serde_json::json!(null))
            .with_dispatch(second);
        assert!(a.accepts(&current));
        assert!(!a.accepts(&AgentResult::success(TaskId::new("t2"), serde_json::json!(null))));
    }

    #[test]
    fn test_round_trip_preserves_private_fields() {
        let mut a = agent();
        a.attach(TaskId::new("t2"));
        let json = serde_json::to_string(&a).unwrap();
        let back: AgentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
        assert!(back.is_consistent());
    }
}
