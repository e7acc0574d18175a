//! Infrastructure layer for swarm-orchestrator
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod analysis;
pub mod config;
pub mod logging;
pub mod messaging;
pub mod persistence;
pub mod workers;

// Re-export commonly used types
pub use analysis::HeuristicAnalysis;
pub use config::{
    ConfigLoader, FileConfig, FileConsensusConfig, FileIntervalsConfig, FileLoggingConfig,
    FileOrchestrationConfig, FileOutputConfig,
};
pub use logging::JsonlEventRecorder;
pub use messaging::InProcessEventBus;
pub use persistence::InMemorySwarmStore;
pub use workers::{AgentBehavior, SimulatedAgent, SimulatedAgentPool};
