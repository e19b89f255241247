// src/exec/backend.rs

//! The seam between the runtime and task execution.
//!
//! The runtime never runs a step itself; it hands ready tasks to an
//! [`ExecutorBackend`]. Production wires in [`StepExecutorBackend`], which
//! forwards to the background executor loop; tests substitute a fake that
//! records dispatches and fabricates completion events.

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::dag::ScheduledTask;

/// How scheduled tasks get executed.
pub trait ExecutorBackend: Send {
    /// Take ownership of a batch of ready tasks. Each one must eventually
    /// produce a `TaskCompleted` runtime event, or the run never finishes.
    fn dispatch(
        &self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: a thin adapter over the executor loop's channel.
pub struct StepExecutorBackend {
    tx: mpsc::Sender<ScheduledTask>,
}

impl StepExecutorBackend {
    pub fn new(tx: mpsc::Sender<ScheduledTask>) -> Self {
        Self { tx }
    }
}

impl ExecutorBackend for StepExecutorBackend {
    fn dispatch(
        &self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.tx.clone();
        Box::pin(async move {
            for task in tasks {
                tx.send(task).await?;
            }
            Ok(())
        })
    }
}
