// src/exec/mod.rs

//! Task execution: the executor loop that runs step sequences, and the
//! backend seam the runtime dispatches through.

pub mod backend;
pub mod executor;

pub use backend::{ExecutorBackend, StepExecutorBackend};
pub use executor::spawn_executor;
