// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the task-graph scheduler
//! - the trigger queue (what happens when triggers arrive while a run is
//!   active)
//! - the main runtime event loop that reacts to:
//!   - debounced file-watch trigger batches
//!   - entry-point seeds
//!   - task completion events
//!   - shutdown signals

pub mod queue;
pub mod runtime;

pub use queue::TriggerQueue;
pub use runtime::{
    RunSummary, Runtime, RuntimeEvent, RuntimeOptions, TaskName, TaskOutcome, TriggerReason,
};
