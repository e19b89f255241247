// src/engine/runtime.rs

use std::path::PathBuf;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::dag::scheduler::{RunReport, ScheduledTask, Scheduler};
use crate::engine::queue::TriggerQueue;
use crate::errors::RunFailure;
use crate::exec::ExecutorBackend;

/// Task names as used across the engine.
pub type TaskName = String;

/// Why a batch of tasks was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// A watched file changed: re-run the tasks and their dependents.
    FileWatch,
    /// A CLI entry point selected root tasks: run their prerequisite
    /// closures, leaves first.
    Entry,
}

/// Result of one task's step sequence.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Success,
    Failed { step_index: usize, message: String },
}

/// Events sent into the runtime from the watcher, the executor, or signal
/// handling.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// One coalesced batch of triggers (a debounced watch batch, or the
    /// entry-point seed at startup).
    TasksTriggered {
        tasks: Vec<TaskName>,
        reason: TriggerReason,
    },
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
        /// Input file set the step runner resolved, for the run record.
        inputs: Vec<PathBuf>,
    },
    ShutdownRequested,
}

/// Knobs for the runtime loop.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    /// Exit as soon as there is nothing left to run and no queued triggers.
    /// True for the one-shot `build` / `deploy` entries, false in watch mode.
    pub exit_when_idle: bool,
}

/// Everything the runtime observed: one report per finished run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<RunReport>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.reports.iter().all(|r| r.is_success())
    }

    /// Aggregate failure listing every failed and skipped task, or `None`
    /// if everything succeeded.
    pub fn failure(&self) -> Option<RunFailure> {
        let failed: Vec<TaskName> = self.reports.iter().flat_map(|r| r.failed()).collect();
        let skipped: Vec<TaskName> = self.reports.iter().flat_map(|r| r.skipped()).collect();
        if failed.is_empty() && skipped.is_empty() {
            None
        } else {
            Some(RunFailure { failed, skipped })
        }
    }
}

/// The main orchestration runtime.
///
/// Consumes events, drives the scheduler, and hands ready tasks to the
/// executor backend. Step failures are recovered here: in watch mode a
/// failing run is logged and the loop keeps waiting for the next change.
pub struct Runtime {
    scheduler: Scheduler,
    queue: TriggerQueue,
    options: RuntimeOptions,

    /// Merged event stream from the watcher, the executor, and signals.
    events_rx: mpsc::Receiver<RuntimeEvent>,
    backend: Box<dyn ExecutorBackend>,

    summary: RunSummary,
    /// Once set, new triggers are refused; in-flight tasks finish.
    shutting_down: bool,
}

impl Runtime {
    pub fn new(
        scheduler: Scheduler,
        options: RuntimeOptions,
        events_rx: mpsc::Receiver<RuntimeEvent>,
        backend: Box<dyn ExecutorBackend>,
    ) -> Self {
        Self {
            scheduler,
            queue: TriggerQueue::new(),
            options,
            events_rx,
            backend,
            summary: RunSummary::default(),
            shutting_down: false,
        }
    }

    /// Main event loop. Returns the accumulated run summary; the caller
    /// decides whether failures are fatal (build/deploy) or not (watch).
    pub async fn run(mut self) -> Result<RunSummary> {
        info!("runtime started");

        while let Some(event) = self.events_rx.recv().await {
            debug!(?event, "handling runtime event");

            let keep_running = match event {
                RuntimeEvent::TasksTriggered { tasks, reason } => {
                    self.handle_triggers(tasks, reason).await?
                }
                RuntimeEvent::TaskCompleted {
                    task,
                    outcome,
                    inputs,
                } => self.handle_completion(task, outcome, inputs).await?,
                RuntimeEvent::ShutdownRequested => {
                    info!("shutdown requested; waiting for in-flight tasks");
                    self.shutting_down = true;
                    !self.scheduler.is_idle()
                }
            };

            if !keep_running {
                break;
            }
        }

        info!("runtime exiting");
        Ok(self.summary)
    }

    async fn handle_triggers(
        &mut self,
        tasks: Vec<TaskName>,
        reason: TriggerReason,
    ) -> Result<bool> {
        if self.shutting_down {
            debug!(?tasks, "ignoring triggers during shutdown");
            return Ok(!self.scheduler.is_idle());
        }

        info!(?tasks, ?reason, "tasks triggered");

        if self.scheduler.is_idle() {
            self.scheduler.start_new_run();
            let mut ready = Vec::new();
            // Anything queued while the previous run was active joins this run.
            for task in self.queue.drain_pending() {
                ready.extend(self.scheduler.trigger_with_dependents(&task));
            }
            for task in &tasks {
                ready.extend(match reason {
                    TriggerReason::FileWatch => self.scheduler.trigger_with_dependents(task),
                    TriggerReason::Entry => self.scheduler.trigger_with_prerequisites(task),
                });
            }
            self.dispatch(ready).await?;
        } else {
            // A run is in flight: coalesce into the next run, never overlap.
            self.queue.record_triggers(tasks);
        }

        self.after_scheduler_step().await
    }

    async fn handle_completion(
        &mut self,
        task: TaskName,
        outcome: TaskOutcome,
        inputs: Vec<PathBuf>,
    ) -> Result<bool> {
        match &outcome {
            TaskOutcome::Success => info!(task = %task, "task completed successfully"),
            TaskOutcome::Failed {
                step_index,
                message,
            } => {
                warn!(task = %task, step_index, error = %message, "task failed");
            }
        }

        let ready = self.scheduler.handle_completion(&task, outcome, inputs);
        self.dispatch(ready).await?;

        self.after_scheduler_step().await
    }

    /// Bookkeeping after every scheduler interaction: record finished runs,
    /// start a queued run if one is waiting, decide whether to keep looping.
    async fn after_scheduler_step(&mut self) -> Result<bool> {
        if let Some(report) = self.scheduler.take_finished_report() {
            let failed = report.failed();
            let skipped = report.skipped();
            if failed.is_empty() && skipped.is_empty() {
                info!(run_id = report.run_id, "run succeeded");
            } else {
                warn!(
                    run_id = report.run_id,
                    ?failed,
                    ?skipped,
                    "run finished with failures"
                );
            }
            self.summary.reports.push(report);
        }

        if self.scheduler.is_idle() && !self.queue.is_empty() && !self.shutting_down {
            self.scheduler.start_new_run();
            let mut ready = Vec::new();
            for task in self.queue.drain_pending() {
                ready.extend(self.scheduler.trigger_with_dependents(&task));
            }
            self.dispatch(ready).await?;
        }

        if self.shutting_down && self.scheduler.is_idle() {
            return Ok(false);
        }

        if self.options.exit_when_idle && self.scheduler.is_idle() && self.queue.is_empty() {
            info!("runtime idle and exit_when_idle=true, stopping");
            return Ok(false);
        }

        Ok(true)
    }

    /// Hand ready tasks to the executor, marking them running first.
    async fn dispatch(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        for task in &tasks {
            debug!(task = %task.name, "dispatching task to executor");
            self.scheduler.mark_running(&task.name);
        }
        if let Err(err) = self.backend.dispatch(tasks).await {
            // If the executor is gone there is nothing sensible left to do.
            error!(error = %err, "failed to dispatch tasks to executor");
            return Err(err);
        }
        Ok(())
    }
}
