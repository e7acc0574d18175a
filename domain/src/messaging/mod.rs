//! Messaging domain
//!
//! Two kinds of messages leave the orchestrator:
//!
//! - [`SwarmEvent`]s are published on the message bus under a [`Topic`] for
//!   any interested subscriber (loggers, the CLI, tests).
//! - [`Communication`]s are addressed records persisted through the store:
//!   assignment notices, cancellations, voting requests and results.

pub mod communication;
pub mod event;
pub mod topic;

pub use communication::{Communication, MessagePriority, MessageType, Recipient};
pub use event::SwarmEvent;
pub use topic::Topic;
