//! Agent domain module
//!
//! Agents are external workers. The subsystem never owns one; it only reads
//! and writes the assignment fields of an [`AgentRecord`](entities::AgentRecord)
//! through the persistence service.

pub mod entities;
pub mod load;
pub mod performance;

pub use entities::{AgentRecord, AgentResult, AgentStatus, Capabilities};
pub use load::{LoadDistribution, RebalanceSuggestion, UnassignedTask};
pub use performance::AgentPerformance;
