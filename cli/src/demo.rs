//! Scenario drivers for the binary
//!
//! Every agent here is simulated in-process; votes are cast on the agents'
//! behalf following their voting recommendations.

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::json;
use std::time::Duration;
use swarm_application::{MessageBus, Subscription, SwarmCoordinator, SwarmStore};
use swarm_domain::{
    AgentId, AgentRecord, AgentRole, ConsensusProposal, ConsensusVote, OutputFormat, ProposalId,
    Task, TaskId, TaskStrategy, Topic,
};
use swarm_infrastructure::{AgentBehavior, SimulatedAgent, SimulatedAgentPool};
use swarm_presentation::{ConsoleFormatter, ProposeArgs, RunArgs};
use tracing::{debug, info};

const SWARM: &str = "demo-swarm";
const DEMO_WAIT: Duration = Duration::from_secs(30);

fn generalist(id: &str, extra: &[String]) -> AgentRecord {
    AgentRecord::new(id, SWARM, "generalist")
        .with_capabilities(AgentRole::all_capabilities())
        .with_capabilities(extra.iter().cloned())
}

/// Sequential and parallel tasks, a plain vote and a consensus-gated task.
pub async fn run_demo(
    coordinator: &SwarmCoordinator,
    pool: &mut SimulatedAgentPool,
    format: OutputFormat,
) -> Result<()> {
    for i in 1..=3 {
        pool.register(SimulatedAgent::new(generalist(&format!("agent-{i}"), &[])))
            .await
            .context("Failed to register simulated agent")?;
    }
    let _agents = pool.start();

    let tasks = [
        Task::new("demo-sequential", SWARM, "Refactor the configuration parser")
            .with_strategy(TaskStrategy::Sequential),
        Task::new("demo-parallel", SWARM, "Index the documentation set")
            .with_strategy(TaskStrategy::Parallel),
    ];
    for task in tasks {
        let task_id = coordinator.submit_task(task).await?;
        let task = coordinator.wait_for_task(&task_id, DEMO_WAIT).await?;
        println!("{}", ConsoleFormatter::task(&task, format));
    }

    let proposal = ConsensusProposal::new(SWARM, json!({ "action": "adopt_style_guide" }), 0.66)?;
    let proposal = coordinator.create_proposal(proposal).await?;
    for (i, approve) in [true, true, false].into_iter().enumerate() {
        let voter = format!("agent-{}", i + 1);
        let vote = if approve {
            ConsensusVote::approve(proposal.id.clone(), voter)
        } else {
            ConsensusVote::reject(proposal.id.clone(), voter).with_reason("prefers the old style")
        };
        coordinator.submit_vote(vote).await?;
    }
    let snapshot = coordinator.get_proposal_status(&proposal.id).await?;
    println!("{}", ConsoleFormatter::proposal(&snapshot, format));

    let gated = Task::new("demo-gated", SWARM, "Rotate the signing keys").with_consensus();
    let task = submit_with_votes(coordinator, gated, DEMO_WAIT).await?;
    println!("{}", ConsoleFormatter::task(&task, format));

    Ok(())
}

/// Submit one task to a pool built from the command line.
pub async fn run_task(
    coordinator: &SwarmCoordinator,
    pool: &mut SimulatedAgentPool,
    args: RunArgs,
    format: OutputFormat,
) -> Result<()> {
    let behaviours = [
        (AgentBehavior::Succeed, args.agents),
        (AgentBehavior::Fail, args.failing),
        (AgentBehavior::Hang, args.hanging),
    ];
    for (behavior, count) in behaviours {
        for i in 1..=count {
            let id = format!("{}-{i}", behavior.as_str());
            pool.register(
                SimulatedAgent::new(generalist(&id, &args.capabilities)).with_behavior(behavior),
            )
            .await
            .context("Failed to register simulated agent")?;
        }
    }
    info!(agents = pool.len(), "Simulated agents ready");
    let _agents = pool.start();

    let mut task = Task::new(TaskId::generate(), SWARM, args.description)
        .with_strategy(args.strategy)
        .with_priority(args.priority)
        .with_max_agents(args.max_agents);
    for capability in args.capabilities {
        task = task.with_capability(capability);
    }
    if args.consensus {
        task = task.with_consensus();
    }

    let task = submit_with_votes(coordinator, task, Duration::from_secs(args.wait_secs)).await?;
    println!("{}", ConsoleFormatter::task(&task, format));
    Ok(())
}

/// Open a proposal and cast the requested votes.
pub async fn run_proposal(
    coordinator: &SwarmCoordinator,
    args: ProposeArgs,
    format: OutputFormat,
) -> Result<()> {
    for i in 1..=args.voters {
        coordinator
            .register_agent(AgentRecord::new(format!("voter-{i}"), SWARM, "reviewer"))
            .await?;
    }

    let mut proposal =
        ConsensusProposal::new(SWARM, json!({ "action": args.action }), args.threshold)?;
    if let Some(ms) = args.deadline_ms {
        proposal = proposal.with_deadline(Utc::now() + chrono::Duration::milliseconds(ms as i64));
    }
    let proposal = coordinator.create_proposal(proposal).await?;

    let turnout = args.turnout.unwrap_or(args.voters).min(args.voters);
    for i in 1..=turnout {
        let voter = format!("voter-{i}");
        let vote = if i <= args.approve {
            ConsensusVote::approve(proposal.id.clone(), voter)
        } else {
            ConsensusVote::reject(proposal.id.clone(), voter)
        };
        let outcome = coordinator.submit_vote(vote).await?;
        debug!(voter = i, ?outcome, "Vote cast");
    }

    let mut snapshot = coordinator.get_proposal_status(&proposal.id).await?;
    if snapshot.status.is_open()
        && let Some(deadline) = snapshot.deadline
    {
        let wait = (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        tokio::time::sleep(wait + Duration::from_millis(100)).await;
        snapshot = coordinator.get_proposal_status(&proposal.id).await?;
    }
    println!("{}", ConsoleFormatter::proposal(&snapshot, format));
    Ok(())
}

/// Submit a task; if it is gated, have every agent vote as recommended.
async fn submit_with_votes(
    coordinator: &SwarmCoordinator,
    task: Task,
    wait: Duration,
) -> Result<Task> {
    let mut created = coordinator.bus().subscribe(&[Topic::ProposalCreated]);
    let gated = task.requires_consensus;
    let task_id = coordinator.submit_task(task).await?;

    if gated {
        let proposal_id = tokio::time::timeout(wait, next_gate_proposal(&mut created, &task_id))
            .await
            .context("Consensus gate never opened")?
            .context("Message bus closed")?;
        cast_recommended_votes(coordinator, &proposal_id).await?;
    }

    Ok(coordinator.wait_for_task(&task_id, wait).await?)
}

async fn next_gate_proposal(
    events: &mut Subscription,
    task_id: &TaskId,
) -> Option<ProposalId> {
    while let Some(event) = events.recv().await {
        if event.task_id.as_ref() == Some(task_id) {
            return event.proposal_id;
        }
    }
    None
}

async fn cast_recommended_votes(
    coordinator: &SwarmCoordinator,
    proposal_id: &ProposalId,
) -> Result<()> {
    let proposal = coordinator.get_proposal_status(proposal_id).await?;
    let voters: Vec<AgentId> = coordinator
        .store()
        .get_proposal(proposal_id)
        .await?
        .map(|p| p.eligible_voters)
        .unwrap_or_default();
    info!(
        proposal_id = %proposal_id,
        strategy = %proposal.strategy,
        voters = voters.len(),
        "Casting recommended votes"
    );

    for agent_id in voters {
        let recommendation = coordinator
            .get_voting_recommendation(proposal_id, &agent_id)
            .await?;
        let vote = ConsensusVote::new(proposal_id.clone(), agent_id, recommendation.vote)
            .with_reason(recommendation.reasoning);
        coordinator.submit_vote(vote).await?;
    }
    Ok(())
}
