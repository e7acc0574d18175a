//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod analysis;
pub mod message_bus;
pub mod progress;
pub mod store;
