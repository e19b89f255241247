// src/exec/executor.rs

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::step::StepRunner;

/// Spawn the background executor loop.
///
/// The returned sender is what the runtime's backend uses to dispatch
/// scheduled tasks. Each task's step sequence runs on its own Tokio task,
/// so independent tasks execute in parallel; steps within one task run
/// sequentially inside [`StepRunner::run_task`].
pub fn spawn_executor(
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    runner: Arc<StepRunner>,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        info!("executor loop started");
        while let Some(task) = rx.recv().await {
            let runtime_tx = runtime_tx.clone();
            let runner = Arc::clone(&runner);
            tokio::spawn(async move {
                run_task(task, runner, runtime_tx).await;
            });
        }
        info!("executor loop finished (channel closed)");
    });

    tx
}

/// Run one task's step sequence and emit a `TaskCompleted` event.
///
/// A step failure becomes a failed outcome carrying the step index and
/// cause; it never takes the process down.
async fn run_task(
    task: ScheduledTask,
    runner: Arc<StepRunner>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    info!(task = %task.name, steps = task.steps.len(), "starting task");

    let (outcome, inputs) = match runner.run_task(&task).await {
        Ok(output) => (TaskOutcome::Success, output.inputs),
        Err(err) => {
            error!(task = %task.name, error = %err, "task step failed");
            (
                TaskOutcome::Failed {
                    step_index: err.step_index,
                    message: err.to_string(),
                },
                Vec::new(),
            )
        }
    };

    if let Err(err) = runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name.clone(),
            outcome,
            inputs,
        })
        .await
    {
        error!(task = %task.name, error = %err, "failed to send completion event");
    }
}
