//! Persistence adapters

mod memory_store;
mod rows;

pub use memory_store::InMemorySwarmStore;
