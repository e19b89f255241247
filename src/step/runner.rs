// src/step/runner.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::debug;

use crate::config::model::StepConfig;
use crate::dag::ScheduledTask;
use crate::errors::StepError;
use crate::glob::GlobList;
use crate::step::transform::{StepContext, TransformRegistry};

/// Result of one step invocation.
#[derive(Debug, Clone, Default)]
pub struct StepRunOutput {
    /// Input files resolved for this step, absolute, deterministic order.
    pub inputs: Vec<PathBuf>,
    /// Files the transform reported producing (may be empty for
    /// side-effect-only transforms).
    pub outputs: Vec<PathBuf>,
}

/// Result of one task's full step sequence.
#[derive(Debug, Clone, Default)]
pub struct TaskRunOutput {
    /// Union of all steps' resolved input sets, in resolution order.
    pub inputs: Vec<PathBuf>,
    /// Union of all steps' produced files.
    pub outputs: Vec<PathBuf>,
}

/// Executes step sequences: resolves input globs at run time, creates
/// destination directories, and invokes the configured transform.
///
/// The runner imposes no ordering between steps of different tasks; within
/// one task, steps run sequentially in declaration order.
#[derive(Debug, Clone)]
pub struct StepRunner {
    registry: Arc<TransformRegistry>,
    project_root: PathBuf,
}

impl StepRunner {
    pub fn new(registry: Arc<TransformRegistry>, project_root: PathBuf) -> Self {
        Self {
            registry,
            project_root,
        }
    }

    pub fn project_root(&self) -> &std::path::Path {
        &self.project_root
    }

    /// Run a task's whole step sequence, stopping at the first failing step.
    pub async fn run_task(&self, task: &ScheduledTask) -> Result<TaskRunOutput, StepError> {
        let mut output = TaskRunOutput::default();

        for (index, step) in task.steps.iter().enumerate() {
            let step_output = self.run_step(&task.name, index, step).await?;
            output.inputs.extend(step_output.inputs);
            output.outputs.extend(step_output.outputs);
        }

        Ok(output)
    }

    /// Run one step: resolve inputs, ensure the destination exists, apply
    /// the transform. Failures are captured with task id and step index.
    pub async fn run_step(
        &self,
        task: &str,
        step_index: usize,
        step: &StepConfig,
    ) -> Result<StepRunOutput, StepError> {
        self.run_step_inner(task, step)
            .await
            .map_err(|cause| StepError {
                task: task.to_string(),
                step_index,
                cause,
            })
    }

    async fn run_step_inner(&self, task: &str, step: &StepConfig) -> Result<StepRunOutput> {
        let transform = self
            .registry
            .get(&step.transform)
            .ok_or_else(|| anyhow!("unknown transform '{}'", step.transform))?;

        // Patterns were compiled at validation time; evaluate them afresh
        // against the current filesystem state.
        let globs = GlobList::parse(&step.inputs)
            .with_context(|| format!("compiling input patterns for task '{task}'"))?;
        let inputs = globs
            .resolve(&self.project_root)
            .with_context(|| format!("resolving input files for task '{task}'"))?;

        let dest = self.project_root.join(&step.dest);
        tokio::fs::create_dir_all(&dest)
            .await
            .with_context(|| format!("creating destination directory {dest:?}"))?;

        debug!(
            task = %task,
            transform = %step.transform,
            inputs = inputs.len(),
            dest = ?dest,
            "running step"
        );

        let outputs = transform
            .apply(StepContext {
                task,
                inputs: &inputs,
                dest: &dest,
                options: &step.options,
                project_root: &self.project_root,
            })
            .await?;

        Ok(StepRunOutput { inputs, outputs })
    }
}
