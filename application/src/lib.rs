//! Application layer for swarm-orchestrator
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{BackgroundIntervals, ConsensusParams, OrchestrationParams, SwarmConfig};
pub use ports::{
    analysis::{AnalysisError, AnalysisService},
    message_bus::{MessageBus, Subscription},
    progress::{NoProgress, ProgressNotifier},
    store::{StoreError, SwarmStore, TaskUpdate},
};
pub use use_cases::agent_assignment::{AgentRegistry, AssignmentQueue, Dispatch};
pub use use_cases::background::{BackgroundComponents, BackgroundProcesses};
pub use use_cases::consensus_engine::{ConsensusEngine, ProposalSnapshot};
pub use use_cases::coordinator::SwarmCoordinator;
pub use use_cases::errors::{ConsensusError, OrchestrationError};
pub use use_cases::execute_phase::PhaseExecutor;
pub use use_cases::plan_execution::ExecutionPlanner;
pub use use_cases::rebalance::Rebalancer;
pub use use_cases::supervise_task::{Execution, ExecutionSnapshot, TaskSupervisor};
