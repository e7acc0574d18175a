//! Application-level configuration.
//!
//! This module provides configuration types that control how use cases behave:
//!
//! - [`OrchestrationParams`] — task pool size, timeouts, retry budget, thresholds
//! - [`ConsensusParams`] — proposal defaults
//! - [`BackgroundIntervals`] — tick intervals of the background processes
//! - [`SwarmConfig`] — container for all of the above

pub mod consensus_params;
pub mod intervals;
pub mod orchestration_params;
pub mod swarm_config;

pub use consensus_params::ConsensusParams;
pub use intervals::BackgroundIntervals;
pub use orchestration_params::OrchestrationParams;
pub use swarm_config::SwarmConfig;
