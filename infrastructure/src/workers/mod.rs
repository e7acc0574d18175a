//! Worker agent adapters
//!
//! Real agents live outside this process. The simulated pool stands in for
//! them in the demo binary and the integration tests.

mod simulated;

pub use simulated::{AgentBehavior, SimulatedAgent, SimulatedAgentPool};
