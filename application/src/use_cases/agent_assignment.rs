//! Agent assignment
//!
//! [`AgentRegistry`] finds, claims and releases agents. Every change to an
//! agent's pointer goes through the store's compare-and-set methods, so an
//! agent is only ever written by whoever currently holds it.
//!
//! [`AssignmentQueue`] holds assignments that found no idle agent; the task
//! distributor drains it through [`AgentRegistry::distribute`].

use crate::ports::message_bus::MessageBus;
use crate::ports::store::{StoreError, SwarmStore};
use crate::use_cases::errors::OrchestrationError;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use swarm_domain::agent::performance::DEFAULT_SUCCESS_RATE;
use swarm_domain::{
    AgentId, AgentRecord, Capabilities, Communication, MessageType, PhaseKind, SwarmEvent,
    SwarmId, TaskId, TaskPriority, Topic, UnassignedTask,
};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// One claim of an agent for a task
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dispatch {
    pub agent_id: AgentId,
    /// Claim number from [`AgentRecord::attach`]
    pub number: u64,
}

impl Dispatch {
    pub fn new(agent_id: AgentId, number: u64) -> Self {
        Self { agent_id, number }
    }
}

/// Capability lookup and single-writer assignment of agents
pub struct AgentRegistry {
    store: Arc<dyn SwarmStore>,
    bus: Arc<dyn MessageBus>,
    /// (task, from) → to, recorded by the rebalancer so waiters can follow
    handoffs: Mutex<HashMap<(TaskId, Dispatch), Dispatch>>,
}

impl AgentRegistry {
    pub fn new(store: Arc<dyn SwarmStore>, bus: Arc<dyn MessageBus>) -> Self {
        Self {
            store,
            bus,
            handoffs: Mutex::new(HashMap::new()),
        }
    }

    /// Best idle agent whose capabilities cover `required`.
    ///
    /// Candidates are ranked by recorded success rate
    /// ([`DEFAULT_SUCCESS_RATE`] without history); the first of equally
    /// ranked agents wins.
    pub async fn find_suitable_agent(
        &self,
        swarm_id: Option<&SwarmId>,
        required: &Capabilities,
    ) -> Result<Option<AgentRecord>, StoreError> {
        let candidates: Vec<AgentRecord> = self
            .store
            .list_agents(swarm_id)
            .await?
            .into_iter()
            .filter(|a| a.is_idle() && a.can_fulfil(required))
            .collect();

        let mut best: Option<(AgentRecord, f64)> = None;
        for agent in candidates {
            let rate = self
                .store
                .get_performance(&agent.id)
                .await?
                .map(|p| p.success_rate())
                .unwrap_or(DEFAULT_SUCCESS_RATE);
            if best.as_ref().is_none_or(|(_, best_rate)| rate > *best_rate) {
                best = Some((agent, rate));
            }
        }

        if let Some((agent, rate)) = &best {
            debug!(agent_id = %agent.id, success_rate = rate, "Suitable agent found");
        } else {
            debug!(required = ?required, "No suitable idle agent");
        }
        Ok(best.map(|(agent, _)| agent))
    }

    /// Claim an idle agent for a task and notify it.
    ///
    /// Returns `Ok(None)` when the agent was not idle. On success the agent
    /// is added to the task's assigned list (once), an assignment
    /// communication is stored, and `taskAssigned` is published with `brief`
    /// plus the claim's `dispatch` number as payload.
    pub async fn assign_task_to_agent(
        &self,
        task_id: &TaskId,
        agent_id: &AgentId,
        brief: Value,
    ) -> Result<Option<Dispatch>, OrchestrationError> {
        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| OrchestrationError::TaskNotFound(task_id.clone()))?;

        let Some(number) = self.store.claim_agent(agent_id, task_id).await? else {
            debug!(agent_id = %agent_id, task_id = %task_id, "Agent no longer idle");
            return Ok(None);
        };
        let brief = with_dispatch(brief, number);

        let assigned = agent_id.clone();
        self.store
            .update_task(
                task_id,
                Box::new(move |task| {
                    task.assign_agent(&assigned);
                }),
            )
            .await?;

        self.notify_agent(&task.swarm_id, agent_id, MessageType::TaskAssignment, brief.clone())
            .await;
        self.bus.publish(
            SwarmEvent::new(Topic::TaskAssigned)
                .with_swarm(&task.swarm_id)
                .with_task(task_id)
                .with_agent(agent_id)
                .with_payload(brief),
        );
        info!(agent_id = %agent_id, task_id = %task_id, dispatch = number, "Agent assigned");
        Ok(Some(Dispatch::new(agent_id.clone(), number)))
    }

    /// Clear the agent's pointer if it still holds `task_id`.
    pub async fn release_agent(
        &self,
        agent_id: &AgentId,
        task_id: &TaskId,
    ) -> Result<bool, StoreError> {
        let released = self.store.release_agent(agent_id, task_id).await?;
        if released {
            debug!(agent_id = %agent_id, task_id = %task_id, "Agent released");
        }
        Ok(released)
    }

    /// Store a communication for one agent. Failures are logged only.
    pub async fn notify_agent(
        &self,
        swarm_id: &SwarmId,
        agent_id: &AgentId,
        message_type: MessageType,
        payload: Value,
    ) {
        let message =
            Communication::to_agent(swarm_id.clone(), agent_id.clone(), message_type, payload);
        if let Err(e) = self.store.create_communication(&message).await {
            warn!(agent_id = %agent_id, "Failed to store {} message: {}", message_type.as_str(), e);
        }
    }

    pub fn record_handoff(&self, task_id: &TaskId, from: &Dispatch, to: Dispatch) {
        if let Ok(mut handoffs) = self.handoffs.lock() {
            handoffs.insert((task_id.clone(), from.clone()), to);
        }
    }

    /// Withdraw a handoff that was recorded but never took effect
    pub fn cancel_handoff(&self, task_id: &TaskId, from: &Dispatch) {
        if let Ok(mut handoffs) = self.handoffs.lock() {
            handoffs.remove(&(task_id.clone(), from.clone()));
        }
    }

    /// Follow a reassignment of `task_id` away from `from`, if one happened.
    pub fn take_handoff(&self, task_id: &TaskId, from: &Dispatch) -> Option<Dispatch> {
        self.handoffs
            .lock()
            .ok()
            .and_then(|mut handoffs| handoffs.remove(&(task_id.clone(), from.clone())))
    }

    /// Drop handoffs of a finished task
    pub fn forget_task(&self, task_id: &TaskId) {
        if let Ok(mut handoffs) = self.handoffs.lock() {
            handoffs.retain(|(task, _), _| task != task_id);
        }
    }

    /// Place queued assignments on agents that have become available.
    ///
    /// Higher priorities go first; FIFO within a priority. Entries whose
    /// waiter has gone away are dropped. Returns the number placed.
    pub async fn distribute(&self, queue: &AssignmentQueue) -> Result<usize, OrchestrationError> {
        let mut pending = queue.take_all();
        if pending.is_empty() {
            return Ok(0);
        }
        pending.sort_by(|a, b| b.priority.cmp(&a.priority));

        let mut placed = 0;
        let mut remaining = Vec::new();
        let mut entries = pending.into_iter();

        while let Some(entry) = entries.next() {
            if entry.responder.is_closed() {
                debug!(task_id = %entry.task_id, "Dropping abandoned queued assignment");
                continue;
            }

            let outcome = self.place(&entry).await;
            match outcome {
                Ok(Some(dispatch)) => {
                    let task_id = entry.task_id.clone();
                    let agent_id = dispatch.agent_id.clone();
                    if entry.responder.send(dispatch).is_err() {
                        self.release_agent(&agent_id, &task_id).await?;
                    } else {
                        placed += 1;
                    }
                }
                Ok(None) => remaining.push(entry),
                Err(e) => {
                    remaining.push(entry);
                    remaining.extend(entries);
                    queue.restore(remaining);
                    return Err(e);
                }
            }
        }

        queue.restore(remaining);
        if placed > 0 {
            info!(placed, waiting = queue.len(), "Queued assignments distributed");
        }
        Ok(placed)
    }

    async fn place(&self, entry: &PendingAssignment) -> Result<Option<Dispatch>, OrchestrationError> {
        let Some(agent) = self
            .find_suitable_agent(Some(&entry.swarm_id), &entry.required_capabilities)
            .await?
        else {
            return Ok(None);
        };
        self.assign_task_to_agent(&entry.task_id, &agent.id, entry.brief.clone())
            .await
    }
}

/// Add the claim number to an assignment brief so the agent can echo it.
fn with_dispatch(brief: Value, number: u64) -> Value {
    match brief {
        Value::Object(mut fields) => {
            fields.insert("dispatch".to_string(), json!(number));
            Value::Object(fields)
        }
        other => json!({ "brief": other, "dispatch": number }),
    }
}

/// An assignment waiting for an agent
#[derive(Debug)]
pub struct PendingAssignment {
    pub task_id: TaskId,
    pub swarm_id: SwarmId,
    pub priority: TaskPriority,
    pub phase: PhaseKind,
    pub required_capabilities: Capabilities,
    /// Payload for the assignment notice once placed
    pub brief: Value,
    pub enqueued_at: Instant,
    responder: oneshot::Sender<Dispatch>,
}

/// FIFO of assignments that found no idle agent
#[derive(Debug, Default)]
pub struct AssignmentQueue {
    entries: Mutex<VecDeque<PendingAssignment>>,
}

impl AssignmentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an assignment; the receiver resolves with the placed claim.
    pub fn enqueue(
        &self,
        task_id: TaskId,
        swarm_id: SwarmId,
        priority: TaskPriority,
        phase: PhaseKind,
        required_capabilities: Capabilities,
        brief: Value,
    ) -> oneshot::Receiver<Dispatch> {
        let (responder, receiver) = oneshot::channel();
        let entry = PendingAssignment {
            task_id,
            swarm_id,
            priority,
            phase,
            required_capabilities,
            brief,
            enqueued_at: Instant::now(),
            responder,
        };
        debug!(task_id = %entry.task_id, phase = %entry.phase, "Assignment queued");
        if let Ok(mut entries) = self.entries.lock() {
            entries.push_back(entry);
        }
        receiver
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live waiting entries as seen by the rebalancer
    pub fn unassigned(&self) -> Vec<UnassignedTask> {
        self.entries
            .lock()
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| !e.responder.is_closed())
                    .map(|e| UnassignedTask {
                        task_id: e.task_id.clone(),
                        required_capabilities: e.required_capabilities.clone(),
                        priority: e.priority,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remove every entry of a task. Returns how many were removed.
    pub fn discard_task(&self, task_id: &TaskId) -> usize {
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|e| &e.task_id != task_id);
        before - entries.len()
    }

    fn take_all(&self) -> Vec<PendingAssignment> {
        self.entries
            .lock()
            .map(|mut entries| entries.drain(..).collect())
            .unwrap_or_default()
    }

    /// Put entries back ahead of anything queued meanwhile
    fn restore(&self, pending: Vec<PendingAssignment>) {
        if let Ok(mut entries) = self.entries.lock() {
            for entry in pending.into_iter().rev() {
                entries.push_front(entry);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn enqueue(queue: &AssignmentQueue, task: &str) -> oneshot::Receiver<Dispatch> {
        queue.enqueue(
            TaskId::new(task),
            SwarmId::new("s"),
            TaskPriority::Medium,
            PhaseKind::Execution,
            Capabilities::from(["execution".to_string()]),
            json!({}),
        )
    }

    #[test]
    fn test_unassigned_skips_abandoned_entries() {
        let queue = AssignmentQueue::new();
        let _kept = enqueue(&queue, "t1");
        drop(enqueue(&queue, "t2"));

        let unassigned = queue.unassigned();
        assert_eq!(queue.len(), 2);
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].task_id, TaskId::new("t1"));
    }

    #[test]
    fn test_dispatch_number_is_added_to_the_brief() {
        let brief = with_dispatch(json!({ "phase": "analysis" }), 4);
        assert_eq!(brief["phase"], "analysis");
        assert_eq!(brief["dispatch"], 4);

        let wrapped = with_dispatch(json!("plain"), 2);
        assert_eq!(wrapped["brief"], "plain");
        assert_eq!(wrapped["dispatch"], 2);
    }

    #[test]
    fn test_discard_task() {
        let queue = AssignmentQueue::new();
        let _a = enqueue(&queue, "t1");
        let _b = enqueue(&queue, "t1");
        let _c = enqueue(&queue, "t2");
        assert_eq!(queue.discard_task(&TaskId::new("t1")), 2);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_restore_keeps_order_ahead_of_new_entries() {
        let queue = AssignmentQueue::new();
        let _a = enqueue(&queue, "t1");
        let _b = enqueue(&queue, "t2");
        let taken = queue.take_all();
        let _c = enqueue(&queue, "t3");
        queue.restore(taken);

        let order: Vec<String> = queue
            .unassigned()
            .into_iter()
            .map(|u| u.task_id.to_string())
            .collect();
        assert_eq!(order, vec!["t1", "t2", "t3"]);
    }
}
