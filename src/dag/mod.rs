// src/dag/mod.rs

//! Task graph representation and scheduling.
//!
//! - [`graph`] owns the validated dependency graph of task definitions.
//! - [`scheduler`] holds the per-run state machine that decides when a
//!   task is ready, when dependents must be skipped, and when a run is done.

pub mod graph;
pub mod scheduler;

pub use graph::{TaskDef, TaskGraph};
pub use scheduler::{RunRecord, RunReport, RunState, ScheduledTask, Scheduler};
