//! Analysis service adapters

mod heuristic;

pub use heuristic::HeuristicAnalysis;
