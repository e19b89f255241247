// src/step/mod.rs

//! Step execution: the uniform transform interface and the runner that
//! feeds it glob-resolved input sets.

pub mod runner;
pub mod transform;

pub use runner::{StepRunOutput, StepRunner, TaskRunOutput};
pub use transform::{
    CopyTransform, ExecTransform, StepContext, SyncTransform, Transform, TransformRegistry,
};
