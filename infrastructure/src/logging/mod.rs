//! Logging infrastructure: structured event recording.
//!
//! Provides [`JsonlEventRecorder`], which appends every bus event to a JSONL
//! file so a run can be replayed or inspected afterwards.

mod jsonl_recorder;

pub use jsonl_recorder::JsonlEventRecorder;
