// src/engine/queue.rs

use std::collections::BTreeSet;

use tracing::debug;

use super::runtime::TaskName;

/// Triggers that arrived while a run was already executing.
///
/// All triggers recorded during one in-flight run coalesce into a single
/// batch, which starts as one new run once the current run finishes. This
/// enforces the at-most-one-concurrent-run invariant: a re-trigger of a
/// task that is still in flight is queued, never run concurrently and never
/// dropped, so rapid successive triggers yield exactly two sequential runs.
#[derive(Debug, Default)]
pub struct TriggerQueue {
    pending: BTreeSet<TaskName>,
}

impl TriggerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Record tasks triggered while a run is in progress.
    pub fn record_triggers<I>(&mut self, tasks: I)
    where
        I: IntoIterator<Item = TaskName>,
    {
        for task in tasks {
            let inserted = self.pending.insert(task.clone());
            debug!(task = %task, inserted, "trigger recorded for next run");
        }
    }

    /// Drain the pending batch for the next run, in deterministic order.
    pub fn drain_pending(&mut self) -> Vec<TaskName> {
        let tasks: Vec<TaskName> = std::mem::take(&mut self.pending).into_iter().collect();
        if !tasks.is_empty() {
            debug!(drained = tasks.len(), "drained queued triggers into new run");
        }
        tasks
    }
}
