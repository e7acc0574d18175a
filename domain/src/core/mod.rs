//! Core domain concepts shared across all subdomains.
//!
//! - [`ids`] — identifier newtypes (tasks, agents, swarms, proposals)
//! - [`error::DomainError`] — domain-level errors
//! - [`string`] — display helpers

pub mod error;
pub mod ids;
pub mod string;
