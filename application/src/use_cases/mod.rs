//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod agent_assignment;
pub mod background;
pub mod consensus_engine;
pub mod coordinator;
pub mod errors;
pub mod execute_phase;
pub mod plan_execution;
pub mod rebalance;
pub mod supervise_task;
