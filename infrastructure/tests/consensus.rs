//! Consensus proposals, votes, deadlines and the task consensus gate.

mod common;

use chrono::Utc;
use common::{Harness, SWARM};
use serde_json::json;
use std::time::Duration;
use swarm_application::{ConsensusError, SwarmStore};
use swarm_domain::{
    AgentRecord, ConsensusOutcome, ConsensusProposal, ConsensusVote, ProposalId, ProposalStatus,
    ResolutionReason, Task, TaskStatus, Topic, VotingStrategy,
};
use swarm_infrastructure::AgentBehavior;

async fn register_voters(harness: &Harness, ids: &[&str]) {
    for id in ids {
        harness
            .store
            .save_agent(&AgentRecord::new(*id, SWARM, "reviewer"))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_supermajority_is_achieved() {
    let harness = Harness::with_defaults();
    register_voters(&harness, &["v1", "v2", "v3"]).await;

    let proposal =
        ConsensusProposal::new(SWARM, json!({ "action": "adopt_style_guide" }), 0.66).unwrap();
    let proposal = harness.coordinator.create_proposal(proposal).await.unwrap();
    assert_eq!(proposal.eligible_voters.len(), 3);

    let first = harness
        .coordinator
        .submit_vote(ConsensusVote::approve(proposal.id.clone(), "v1"))
        .await
        .unwrap();
    assert!(matches!(first, ConsensusOutcome::Pending { .. }));
    harness
        .coordinator
        .submit_vote(ConsensusVote::approve(proposal.id.clone(), "v2"))
        .await
        .unwrap();
    let last = harness
        .coordinator
        .submit_vote(ConsensusVote::reject(proposal.id.clone(), "v3").with_reason("too strict"))
        .await
        .unwrap();

    let ConsensusOutcome::Achieved(result) = last else {
        panic!("expected achieved, got {last:?}");
    };
    assert!((result.ratio - 2.0 / 3.0).abs() < 1e-3);
    assert_eq!(result.reason, ResolutionReason::ThresholdMet);

    let status = harness.coordinator.get_proposal_status(&proposal.id).await.unwrap();
    assert_eq!(status.status, ProposalStatus::Achieved);
    assert_eq!(status.strategy, VotingStrategy::Supermajority);
    assert_eq!((status.positive_votes, status.negative_votes), (2, 1));

    harness.shutdown().await;
}

#[tokio::test]
async fn test_deadline_without_votes_fails() {
    let harness = Harness::with_defaults();
    register_voters(&harness, &["v1", "v2"]).await;
    let mut events = harness.bus_events(&[Topic::ConsensusFailed]);

    let proposal = ConsensusProposal::new(SWARM, json!({ "action": "rename_swarm" }), 0.5)
        .unwrap()
        .with_deadline(Utc::now() + chrono::Duration::milliseconds(100));
    let proposal = harness.coordinator.create_proposal(proposal).await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("deadline fires")
        .expect("bus open");
    assert_eq!(event.proposal_id.as_ref(), Some(&proposal.id));

    let status = harness.coordinator.get_proposal_status(&proposal.id).await.unwrap();
    assert_eq!(status.status, ProposalStatus::Failed);
    let result = status.result.unwrap();
    assert_eq!(result.participation_rate, 0.0);
    assert_eq!(result.reason, ResolutionReason::Deadline);

    harness.shutdown().await;
}

#[tokio::test]
async fn test_resolved_status_is_stable() {
    let harness = Harness::with_defaults();
    register_voters(&harness, &["v1", "v2"]).await;

    let proposal = ConsensusProposal::new(SWARM, json!({ "action": "noop" }), 1.0).unwrap();
    let proposal = harness.coordinator.create_proposal(proposal).await.unwrap();
    harness
        .coordinator
        .submit_vote(ConsensusVote::reject(proposal.id.clone(), "v1"))
        .await
        .unwrap();
    harness
        .coordinator
        .submit_vote(ConsensusVote::reject(proposal.id.clone(), "v2"))
        .await
        .unwrap();

    let before = harness.coordinator.get_proposal_status(&proposal.id).await.unwrap();
    assert_eq!(before.status, ProposalStatus::Failed);

    let late = harness
        .coordinator
        .submit_vote(ConsensusVote::approve(proposal.id.clone(), "v1"))
        .await;
    assert!(matches!(late, Err(ConsensusError::InvalidVote(_))));

    let after = harness.coordinator.get_proposal_status(&proposal.id).await.unwrap();
    assert_eq!(before.result, after.result);
    assert_eq!(before.status, after.status);

    harness.shutdown().await;
}

#[tokio::test]
async fn test_vote_checks() {
    let harness = Harness::with_defaults();
    register_voters(&harness, &["v1", "v2"]).await;

    let unknown = harness
        .coordinator
        .submit_vote(ConsensusVote::approve("missing", "v1"))
        .await;
    assert!(matches!(unknown, Err(ConsensusError::ProposalNotFound(_))));

    let proposal = ConsensusProposal::new(SWARM, json!({ "action": "noop" }), 0.5).unwrap();
    let proposal = harness.coordinator.create_proposal(proposal).await.unwrap();
    let outsider = harness
        .coordinator
        .submit_vote(ConsensusVote::approve(proposal.id.clone(), "intruder"))
        .await;
    assert!(matches!(outsider, Err(ConsensusError::InvalidVote(_))));

    // last vote wins
    harness
        .coordinator
        .submit_vote(ConsensusVote::reject(proposal.id.clone(), "v1"))
        .await
        .unwrap();
    harness
        .coordinator
        .submit_vote(ConsensusVote::approve(proposal.id.clone(), "v1"))
        .await
        .unwrap();
    let status = harness.coordinator.get_proposal_status(&proposal.id).await.unwrap();
    assert_eq!((status.positive_votes, status.negative_votes), (1, 0));

    let invalid = ConsensusProposal::new(SWARM, json!({}), 1.5);
    assert!(invalid.is_err());

    harness.shutdown().await;
}

#[tokio::test]
async fn test_voting_recommendation_uses_strategy() {
    let harness = Harness::with_defaults();
    register_voters(&harness, &["v1"]).await;

    let proposal = ConsensusProposal::new(
        SWARM,
        json!({ "action": "approve_task", "expertise": ["reviewer"] }),
        1.0,
    )
    .unwrap();
    let proposal = harness.coordinator.create_proposal(proposal).await.unwrap();
    let recommendation = harness
        .coordinator
        .get_voting_recommendation(&proposal.id, &"v1".into())
        .await
        .unwrap();
    assert_eq!(recommendation.strategy, VotingStrategy::Unanimous);
    assert!(recommendation.vote);

    let missing = harness
        .coordinator
        .get_voting_recommendation(&proposal.id, &"ghost".into())
        .await;
    assert!(matches!(missing, Err(ConsensusError::AgentNotFound(_))));

    harness.shutdown().await;
}

async fn gate_proposal(events: &mut swarm_application::Subscription) -> ProposalId {
    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("gate opens a proposal")
        .expect("bus open");
    event.proposal_id.expect("proposal id on event")
}

#[tokio::test]
async fn test_consensus_gate_releases_approved_task() {
    let mut harness = Harness::with_defaults();
    harness.generalist("g1", AgentBehavior::Succeed).await;
    harness.generalist("g2", AgentBehavior::Succeed).await;
    harness.start_agents();
    let mut created = harness.bus_events(&[Topic::ProposalCreated]);

    let task = Task::new("gated", SWARM, "fix typo").with_consensus();
    let task_id = harness.coordinator.submit_task(task).await.unwrap();
    let proposal_id = gate_proposal(&mut created).await;

    let waiting = harness.coordinator.task_status(&task_id).await.unwrap();
    assert_eq!(waiting.status, TaskStatus::AwaitingConsensus);

    for voter in ["g1", "g2"] {
        harness
            .coordinator
            .submit_vote(ConsensusVote::approve(proposal_id.clone(), voter))
            .await
            .unwrap();
    }

    let task = harness
        .coordinator
        .wait_for_task(&task_id, Duration::from_secs(10))
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Completed);

    harness.shutdown().await;
}

#[tokio::test]
async fn test_consensus_gate_fails_rejected_task() {
    let mut harness = Harness::with_defaults();
    harness.generalist("g1", AgentBehavior::Succeed).await;
    harness.start_agents();
    let mut created = harness.bus_events(&[Topic::ProposalCreated]);

    let task = Task::new("gated", SWARM, "fix typo").with_consensus();
    let task_id = harness.coordinator.submit_task(task).await.unwrap();
    let proposal_id = gate_proposal(&mut created).await;

    harness
        .coordinator
        .submit_vote(ConsensusVote::reject(proposal_id, "g1"))
        .await
        .unwrap();

    let task = harness
        .coordinator
        .wait_for_task(&task_id, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    let agent = harness.store.get_agent(&"g1".into()).await.unwrap().unwrap();
    assert!(agent.last_result.is_none());

    harness.shutdown().await;
}

#[tokio::test]
async fn test_cancel_decision_cancels_linked_task() {
    let harness = Harness::with_defaults();
    register_voters(&harness, &["v1"]).await;
    let task = Task::new("doomed", SWARM, "fix typo");
    harness.store.save_task(&task).await.unwrap();

    let proposal = ConsensusProposal::new(SWARM, json!({ "action": "cancel_task" }), 0.5)
        .unwrap()
        .with_task("doomed");
    let proposal = harness.coordinator.create_proposal(proposal).await.unwrap();
    harness
        .coordinator
        .submit_vote(ConsensusVote::approve(proposal.id, "v1"))
        .await
        .unwrap();

    let task = harness.coordinator.task_status(&"doomed".into()).await.unwrap();
    assert_eq!(task.status, TaskStatus::Cancelled);

    harness.shutdown().await;
}
