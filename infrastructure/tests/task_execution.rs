//! End-to-end task execution through the coordinator with simulated agents.

mod common;

use common::{Harness, SWARM, distributing_intervals, fast_orchestration};
use std::time::Duration;
use swarm_application::{ConsensusParams, OrchestrationError, SwarmStore};
use swarm_domain::{
    AgentId, AgentPerformance, AgentRecord, AgentRole, Capabilities, ExecutionReport,
    MessageType, PhaseKind, RebalanceSuggestion, Recipient, SwarmId, Task, TaskId, TaskStatus,
    TaskStrategy, Topic,
};
use swarm_infrastructure::{AgentBehavior, SimulatedAgent};

const WAIT: Duration = Duration::from_secs(10);

fn report_of(task: &Task) -> ExecutionReport {
    let result = task.result.clone().expect("completed task carries a report");
    serde_json::from_value(result).expect("report deserializes")
}

#[tokio::test]
async fn test_sequential_task_runs_four_phases_in_order() {
    let mut harness = Harness::with_defaults();
    harness.generalist("agent-1", AgentBehavior::Succeed).await;
    harness.start_agents();
    let mut events = harness.bus_events(&[Topic::PhaseCompleted]);

    let task = Task::new("t1", SWARM, "fix typo").with_strategy(TaskStrategy::Sequential);
    let task_id = harness.coordinator.submit_task(task).await.unwrap();
    let task = harness.coordinator.wait_for_task(&task_id, WAIT).await.unwrap();

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.progress, 100.0);
    let report = report_of(&task);
    let phases: Vec<PhaseKind> = report.phase_results.iter().map(|p| p.phase).collect();
    assert_eq!(
        phases,
        vec![
            PhaseKind::Analysis,
            PhaseKind::Planning,
            PhaseKind::Execution,
            PhaseKind::Validation,
        ]
    );
    assert_eq!(report.summary.successful_phases, 4);

    let completed: Vec<usize> = events
        .drain()
        .iter()
        .filter(|e| e.task_id.as_ref() == Some(&task_id))
        .map(|e| e.payload["phase_index"].as_u64().unwrap_or(u64::MAX) as usize)
        .collect();
    assert_eq!(completed, vec![0, 1, 2, 3]);

    let agent = harness.store.get_agent(&AgentId::new("agent-1")).await.unwrap().unwrap();
    assert!(agent.is_idle());
    assert!(agent.current_task().is_none());

    harness.shutdown().await;
}

#[tokio::test]
async fn test_hanging_agent_times_out_without_retry() {
    let orchestration = fast_orchestration()
        .with_assignment_timeout(Duration::from_millis(1000))
        .with_retry_budget(0);
    let mut harness = Harness::new(orchestration, ConsensusParams::default());
    harness.generalist("sleepy", AgentBehavior::Hang).await;
    harness.start_agents();

    let task = Task::new("t2", SWARM, "fix typo").with_strategy(TaskStrategy::Sequential);
    let task_id = harness.coordinator.submit_task(task).await.unwrap();
    let task = harness.coordinator.wait_for_task(&task_id, WAIT).await.unwrap();

    assert_eq!(task.status, TaskStatus::Failed);
    let error = task.error.unwrap();
    assert!(error.contains("AgentTimeout"), "unexpected error: {error}");
    assert!(error.contains("sleepy"));

    // the timed out agent was let go
    let agent = harness.store.get_agent(&AgentId::new("sleepy")).await.unwrap().unwrap();
    assert!(agent.is_idle());

    harness.shutdown().await;
}

#[tokio::test]
async fn test_failed_checkpoint_stops_later_phases() {
    let mut harness = Harness::with_defaults();
    harness
        .agent(
            SimulatedAgent::new(AgentRecord::new("analyst", SWARM, "analyst").with_capability("analysis"))
                .with_behavior(AgentBehavior::Fail),
        )
        .await;
    harness
        .agent(SimulatedAgent::new(
            AgentRecord::new("builder", SWARM, "builder")
                .with_capabilities(["architecture", "execution", "validation"]),
        ))
        .await;
    harness.start_agents();

    let task = Task::new("t3", SWARM, "fix typo").with_strategy(TaskStrategy::Sequential);
    let task_id = harness.coordinator.submit_task(task).await.unwrap();
    let task = harness.coordinator.wait_for_task(&task_id, WAIT).await.unwrap();

    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.error.unwrap().contains("CheckpointFailed"));

    let builder = harness.store.get_agent(&AgentId::new("builder")).await.unwrap().unwrap();
    assert!(builder.last_result.is_none(), "no later phase was dispatched");

    harness.shutdown().await;
}

#[tokio::test]
async fn test_best_performer_is_chosen() {
    let harness = Harness::with_defaults();
    let capable = |id: &str| AgentRecord::new(id, SWARM, "coder").with_capability("execution");
    harness.store.save_agent(&capable("steady")).await.unwrap();
    harness.store.save_agent(&capable("shaky")).await.unwrap();
    harness
        .store
        .seed_performance(AgentPerformance::with_history(AgentId::new("steady"), 9, 10))
        .await
        .unwrap();
    harness
        .store
        .seed_performance(AgentPerformance::with_history(AgentId::new("shaky"), 4, 10))
        .await
        .unwrap();

    let required: Capabilities = ["execution".to_string()].into_iter().collect();
    let found = harness
        .coordinator
        .registry()
        .find_suitable_agent(None, &required)
        .await
        .unwrap()
        .expect("an idle agent fits");
    assert_eq!(found.id, AgentId::new("steady"));

    harness.shutdown().await;
}

#[tokio::test]
async fn test_unfinished_dependency_is_rejected() {
    let harness = Harness::with_defaults();
    let parent = Task::new("parent", SWARM, "fix typo");
    harness.store.save_task(&parent).await.unwrap();

    let child = Task::new("child", SWARM, "follow up").with_dependency("parent");
    let err = harness.coordinator.submit_task(child).await.unwrap_err();
    match err {
        OrchestrationError::DependenciesNotMet { task_id, pending } => {
            assert_eq!(task_id, TaskId::new("child"));
            assert_eq!(pending, vec![TaskId::new("parent")]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(harness.store.get_task(&TaskId::new("child")).await.unwrap().is_none());

    harness.shutdown().await;
}

#[tokio::test]
async fn test_cancel_running_task() {
    let mut harness = Harness::with_defaults();
    harness.generalist("stuck", AgentBehavior::Hang).await;
    harness.start_agents();
    let mut events = harness.bus_events(&[Topic::TaskCancelled]);

    let task = Task::new("t4", SWARM, "fix typo").with_strategy(TaskStrategy::Sequential);
    let task_id = harness.coordinator.submit_task(task).await.unwrap();

    // wait for the first assignment to land
    let agent_id = AgentId::new("stuck");
    for _ in 0..100 {
        let agent = harness.store.get_agent(&agent_id).await.unwrap().unwrap();
        if agent.holds(&task_id) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    harness
        .coordinator
        .cancel_task(&task_id, Some("operator request".to_string()))
        .await
        .unwrap();

    let task = harness.coordinator.task_status(&task_id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Cancelled);
    let agent = harness.store.get_agent(&agent_id).await.unwrap().unwrap();
    assert!(agent.is_idle());
    assert!(harness.coordinator.active_executions().await.is_empty());
    assert_eq!(events.drain().len(), 1);

    // a second cancel finds nothing to stop
    let again = harness.coordinator.cancel_task(&task_id, None).await;
    assert!(matches!(again, Err(OrchestrationError::TaskNotActive(_))));

    harness.shutdown().await;
}

#[tokio::test]
async fn test_busy_iff_holding_a_task() {
    let mut harness = Harness::with_intervals(
        fast_orchestration(),
        ConsensusParams::default(),
        distributing_intervals(),
    );
    harness.generalist("a1", AgentBehavior::Succeed).await;
    harness.generalist("a2", AgentBehavior::Succeed).await;
    harness.start_agents();
    harness.coordinator.start_background().await;

    let first = Task::new("p1", SWARM, "fix typo").with_strategy(TaskStrategy::Parallel);
    let second = Task::new("p2", SWARM, "fix lint").with_strategy(TaskStrategy::Parallel);
    let first = harness.coordinator.submit_task(first).await.unwrap();
    let second = harness.coordinator.submit_task(second).await.unwrap();

    for _ in 0..20 {
        for agent in harness.store.list_agents(None).await.unwrap() {
            assert!(agent.is_consistent(), "agent {} is inconsistent", agent.id);
        }
        tokio::time::sleep(Duration::from_millis(15)).await;
    }

    for id in [first, second] {
        let task = harness.coordinator.wait_for_task(&id, WAIT).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
    }
    for agent in harness.store.list_agents(None).await.unwrap() {
        assert!(agent.is_idle());
        assert!(agent.is_consistent());
    }

    harness.shutdown().await;
}

#[tokio::test]
async fn test_rebalance_is_noop_without_idle_agents_or_waiting_work() {
    let harness = Harness::with_defaults();
    for id in ["busy-1", "busy-2"] {
        let agent = AgentId::new(id);
        harness
            .store
            .save_agent(&AgentRecord::new(id, SWARM, "coder").with_capability("execution"))
            .await
            .unwrap();
        let job = TaskId::new(format!("{id}-job"));
        assert!(harness.store.claim_agent(&agent, &job).await.unwrap().is_some());
    }

    let applied = harness.coordinator.rebalance().await.unwrap();
    assert!(applied.is_empty());

    let messages = harness.store.list_communications(&SwarmId::new(SWARM)).await.unwrap();
    assert!(messages.is_empty());
    for id in ["busy-1", "busy-2"] {
        let agent = harness.store.get_agent(&AgentId::new(id)).await.unwrap().unwrap();
        assert!(agent.holds(&TaskId::new(format!("{id}-job"))));
    }

    harness.shutdown().await;
}

#[tokio::test]
async fn test_queued_assignments_on_one_agent_never_share_a_result() {
    let mut harness = Harness::with_intervals(
        fast_orchestration(),
        ConsensusParams::default(),
        distributing_intervals(),
    );
    let record = AgentRecord::new("solo", SWARM, "generalist")
        .with_capabilities(AgentRole::all_capabilities());
    harness
        .register(SimulatedAgent::new(record).with_delay(Duration::from_millis(100)))
        .await;
    harness.start_agents();
    harness.coordinator.start_background().await;

    // forty words: medium complexity, so parallel execution wants three executors
    let description = vec!["word"; 40].join(" ");
    let task = Task::new("tp", SWARM, description)
        .with_strategy(TaskStrategy::Parallel)
        .with_max_agents(3);
    let task_id = harness.coordinator.submit_task(task).await.unwrap();
    let task = harness.coordinator.wait_for_task(&task_id, WAIT).await.unwrap();
    assert_eq!(task.status, TaskStatus::Completed);

    let report = report_of(&task);
    let mut dispatched = 0;
    for phase in &report.phase_results {
        for outcome in &phase.results {
            assert!(outcome.success, "{} outcome failed: {:?}", phase.phase, outcome.error);
            assert_eq!(outcome.output["phase"], phase.phase.as_str());
            dispatched += 1;
        }
    }
    let executors = report
        .phase_results
        .iter()
        .find(|p| p.phase == PhaseKind::ParallelExecution)
        .map(|p| p.results.len());
    assert_eq!(executors, Some(3));

    let solo = harness.store.get_agent(&AgentId::new("solo")).await.unwrap().unwrap();
    assert!(solo.is_idle());
    assert!(solo.is_consistent());
    // one claim per outcome
    assert_eq!(solo.dispatch(), dispatched);

    harness.shutdown().await;
}

#[tokio::test]
async fn test_rebalance_moves_work_and_the_waiter_follows() {
    let mut harness = Harness::with_intervals(
        fast_orchestration(),
        ConsensusParams::default(),
        distributing_intervals(),
    );
    // "slow" alone can take gpu analysis work but never answers
    let slow = AgentRecord::new("slow", SWARM, "worker").with_capabilities(["analysis", "gpu"]);
    harness
        .agent(SimulatedAgent::new(slow).with_behavior(AgentBehavior::Hang))
        .await;
    let fresh = AgentRecord::new("fresh", SWARM, "worker")
        .with_capabilities(AgentRole::all_capabilities());
    harness
        .register(SimulatedAgent::new(fresh).with_delay(Duration::from_millis(200)))
        .await;
    for i in 0..4 {
        harness
            .agent(SimulatedAgent::new(AgentRecord::new(format!("filler-{i}"), SWARM, "filler")))
            .await;
    }
    harness.start_agents();
    harness.coordinator.start_background().await;

    let slow_id = AgentId::new("slow");
    let fresh_id = AgentId::new("fresh");
    for i in 0..4 {
        let filler = AgentId::new(format!("filler-{i}"));
        let job = TaskId::new(format!("filler-job-{i}"));
        assert!(harness.store.claim_agent(&filler, &job).await.unwrap().is_some());
    }
    // keep "fresh" out of the way until "slow" has the first task
    let parked = TaskId::new("parked");
    assert!(harness.store.claim_agent(&fresh_id, &parked).await.unwrap().is_some());

    let first = Task::new("ta", SWARM, "fix typo").with_strategy(TaskStrategy::Sequential);
    let first = harness.coordinator.submit_task(first).await.unwrap();
    let mut held = false;
    for _ in 0..100 {
        let agent = harness.store.get_agent(&slow_id).await.unwrap().unwrap();
        if agent.holds(&first) {
            held = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(held, "slow agent never picked up the first task");
    assert!(harness.store.release_agent(&fresh_id, &parked).await.unwrap());

    let mut reassigned = harness.bus_events(&[Topic::AgentReassigned]);
    let gpu = Task::new("tb", SWARM, "fix kernel")
        .with_strategy(TaskStrategy::Sequential)
        .with_capability("gpu");
    let gpu = harness.coordinator.submit_task(gpu).await.unwrap();

    let mut applied = Vec::new();
    for _ in 0..100 {
        applied = harness.coordinator.rebalance().await.unwrap();
        if !applied.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(
        applied,
        vec![RebalanceSuggestion {
            task_id: first.clone(),
            from_agent: slow_id.clone(),
            to_agent: fresh_id.clone(),
        }]
    );

    let fresh = harness.store.get_agent(&fresh_id).await.unwrap().unwrap();
    assert!(fresh.holds(&first));
    let slow = harness.store.get_agent(&slow_id).await.unwrap().unwrap();
    assert!(!slow.holds(&first));
    assert!(slow.is_consistent());

    let events = reassigned.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].agent_id.as_ref(), Some(&fresh_id));
    let messages = harness.store.list_communications(&SwarmId::new(SWARM)).await.unwrap();
    for agent in [&slow_id, &fresh_id] {
        assert!(
            messages.iter().any(|m| m.message_type == MessageType::TaskReassignment
                && m.recipient == Recipient::Agent(agent.clone())),
            "{agent} was not told about the move"
        );
    }

    // the distributor hands the freed agent the queued gpu work
    let mut placed = false;
    for _ in 0..100 {
        let agent = harness.store.get_agent(&slow_id).await.unwrap().unwrap();
        if agent.holds(&gpu) {
            placed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(placed, "queued gpu assignment was never placed");

    // the analysis phase of the first task finishes on the new agent
    let task = harness.coordinator.wait_for_task(&first, WAIT).await.unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    let report = report_of(&task);
    let analysis = &report.phase_results[0];
    assert_eq!(analysis.phase, PhaseKind::Analysis);
    assert!(analysis.results[0].success);
    assert_eq!(analysis.results[0].agent_id.as_ref(), Some(&fresh_id));

    let fresh = harness.store.get_agent(&fresh_id).await.unwrap().unwrap();
    assert!(fresh.is_idle());

    harness.shutdown().await;
}
