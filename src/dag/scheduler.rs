// src/dag/scheduler.rs

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::config::model::StepConfig;
use crate::dag::graph::TaskGraph;
use crate::engine::{TaskName, TaskOutcome};

/// Per-run state of a task.
///
/// `Succeeded`, `Failed` and `Skipped` are terminal; a run is finished once
/// every participating task is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Participating in this run, waiting on prerequisites.
    Pending,
    /// All prerequisites satisfied; handed to the dispatcher.
    Ready,
    /// Step sequence currently executing.
    Running,
    Succeeded,
    Failed,
    /// Never started because a prerequisite failed or was skipped.
    Skipped,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed | RunState::Skipped)
    }
}

/// Description of a task the scheduler wants executed now.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub steps: Vec<StepConfig>,
    pub run_id: u64,
}

/// Transient record of one task execution within one run.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub task: TaskName,
    pub state: RunState,
    pub started_at: Option<SystemTime>,
    /// Input file set resolved by the step runner, reported on completion.
    pub inputs: Vec<PathBuf>,
    pub error: Option<String>,
}

/// Snapshot of a finished run: one record per participating task, in
/// registration order. Not persisted across process restarts.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: u64,
    pub records: Vec<RunRecord>,
}

impl RunReport {
    pub fn failed(&self) -> Vec<TaskName> {
        self.tasks_in_state(RunState::Failed)
    }

    pub fn skipped(&self) -> Vec<TaskName> {
        self.tasks_in_state(RunState::Skipped)
    }

    pub fn is_success(&self) -> bool {
        self.records
            .iter()
            .all(|r| r.state == RunState::Succeeded)
    }

    fn tasks_in_state(&self, state: RunState) -> Vec<TaskName> {
        self.records
            .iter()
            .filter(|r| r.state == state)
            .map(|r| r.task.clone())
            .collect()
    }
}

/// Mutable per-run bookkeeping for one task.
#[derive(Debug, Clone, Default)]
struct TaskRun {
    /// `None` if not participating in the current run.
    state: Option<RunState>,
    started_at: Option<SystemTime>,
    inputs: Vec<PathBuf>,
    error: Option<String>,
    /// Last run ID in which this task succeeded. Lets later incremental runs
    /// treat an untriggered prerequisite as satisfied.
    last_successful_run: Option<u64>,
}

impl TaskRun {
    fn reset(&mut self) {
        self.state = None;
        self.started_at = None;
        self.inputs.clear();
        self.error = None;
    }
}

/// Scheduler holds the immutable task graph plus mutable per-run state.
///
/// It decides which triggered tasks are ready (prerequisites satisfied),
/// skips dependents of failed tasks, and snapshots a [`RunReport`] when all
/// participating tasks reach a terminal state.
#[derive(Debug)]
pub struct Scheduler {
    graph: TaskGraph,
    runs: HashMap<TaskName, TaskRun>,

    /// Monotonically increasing run ID.
    run_counter: u64,
    /// Currently active run ID, or `None` when idle.
    current_run_id: Option<u64>,
    /// Report of the most recently finished run, until taken.
    finished: Option<RunReport>,
}

impl Scheduler {
    /// Construct a scheduler over a validated [`TaskGraph`].
    pub fn new(graph: TaskGraph) -> Self {
        let runs = graph
            .tasks()
            .map(|name| (name.to_string(), TaskRun::default()))
            .collect();
        Self {
            graph,
            runs,
            run_counter: 0,
            current_run_id: None,
            finished: None,
        }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Returns `true` if there is currently no active run.
    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    /// Read-only view of a task's state in the current run.
    pub fn run_state_of(&self, task: &str) -> Option<RunState> {
        self.runs.get(task).and_then(|r| r.state)
    }

    /// Start a new run, resetting per-run state but keeping historical
    /// success information for later incremental runs.
    pub fn start_new_run(&mut self) {
        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);
        self.finished = None;

        for run in self.runs.values_mut() {
            run.reset();
        }

        debug!(run_id = self.run_counter, "scheduler: starting new run");
    }

    /// Include a task and its transitive prerequisites in the current run
    /// (one-shot entry semantics: leaves first, the task itself last).
    ///
    /// Returns tasks that became ready.
    pub fn trigger_with_prerequisites(&mut self, task: &str) -> Vec<ScheduledTask> {
        self.ensure_run_active();
        if self.graph.contains(task) {
            let closure = self.graph.prerequisite_closure(&[task.to_string()]);
            self.mark_pending(&closure);
        } else {
            warn!(task = %task, "trigger for unknown task; ignoring");
        }
        self.advance()
    }

    /// Include a task and its transitive dependents in the current run
    /// (watch-trigger semantics: re-run the changed task and everything
    /// downstream of it).
    ///
    /// Returns tasks that became ready.
    pub fn trigger_with_dependents(&mut self, task: &str) -> Vec<ScheduledTask> {
        self.ensure_run_active();
        if self.graph.contains(task) {
            let closure = self.graph.dependent_closure(task);
            self.mark_pending(&closure);
        } else {
            warn!(task = %task, "trigger for unknown task; ignoring");
        }
        self.advance()
    }

    /// Transition a dispatched task from `Ready` to `Running`.
    pub fn mark_running(&mut self, task: &str) {
        if let Some(run) = self.runs.get_mut(task) {
            if run.state == Some(RunState::Ready) {
                run.state = Some(RunState::Running);
                run.started_at = Some(SystemTime::now());
                debug!(task = %task, "task running");
            } else {
                warn!(task = %task, state = ?run.state, "mark_running on non-ready task");
            }
        }
    }

    /// Handle completion of a task's step sequence.
    ///
    /// On success, dependents whose prerequisites are now satisfied become
    /// ready. On failure, not-yet-started dependents are skipped; unrelated
    /// branches continue.
    pub fn handle_completion(
        &mut self,
        task: &str,
        outcome: TaskOutcome,
        inputs: Vec<PathBuf>,
    ) -> Vec<ScheduledTask> {
        let Some(run_id) = self.current_run_id else {
            warn!(task = %task, "completion with no active run; ignoring");
            return Vec::new();
        };

        match self.runs.get_mut(task) {
            Some(run) => {
                run.inputs = inputs;
                match outcome {
                    TaskOutcome::Success => {
                        run.state = Some(RunState::Succeeded);
                        run.last_successful_run = Some(run_id);
                        debug!(task = %task, run_id, "task succeeded");
                    }
                    TaskOutcome::Failed {
                        step_index,
                        message,
                    } => {
                        run.state = Some(RunState::Failed);
                        run.error = Some(message.clone());
                        warn!(
                            task = %task,
                            run_id,
                            step_index,
                            error = %message,
                            "task failed; skipping dependents in this run"
                        );
                    }
                }
            }
            None => {
                warn!(task = %task, "completion for unknown task; ignoring");
            }
        }

        self.advance()
    }

    /// Take the report of the most recently finished run, if any.
    pub fn take_finished_report(&mut self) -> Option<RunReport> {
        self.finished.take()
    }

    fn ensure_run_active(&mut self) {
        if self.current_run_id.is_none() {
            self.start_new_run();
        }
    }

    fn mark_pending(&mut self, tasks: &[TaskName]) {
        for name in tasks {
            if let Some(run) = self.runs.get_mut(name) {
                if run.state.is_none() {
                    run.state = Some(RunState::Pending);
                    debug!(task = %name, "marked Pending for this run");
                }
            }
        }
    }

    /// Drive pending tasks forward: ready those whose prerequisites are all
    /// satisfied, skip those whose prerequisites can no longer succeed, and
    /// finish the run once everything participating is terminal.
    ///
    /// Skips cascade (a skipped prerequisite skips its own dependents), so
    /// this loops to a fixpoint. Ready tasks come back in registration order.
    fn advance(&mut self) -> Vec<ScheduledTask> {
        let run_id = self.current_run_id.unwrap_or(0);
        let mut ready = Vec::new();

        loop {
            let mut skipped_any = false;

            let pending: Vec<TaskName> = self
                .graph
                .tasks()
                .filter(|name| self.run_state_of(name) == Some(RunState::Pending))
                .map(|s| s.to_string())
                .collect();

            for name in pending {
                match self.classify(&name) {
                    Readiness::Ready => {
                        if let Some(run) = self.runs.get_mut(&name) {
                            run.state = Some(RunState::Ready);
                        }
                        debug!(task = %name, "prerequisites satisfied; marking Ready");
                        let steps = self
                            .graph
                            .get(&name)
                            .map(|d| d.steps.clone())
                            .unwrap_or_default();
                        ready.push(ScheduledTask {
                            name,
                            steps,
                            run_id,
                        });
                    }
                    Readiness::Blocked => {}
                    Readiness::Unsatisfiable(reason) => {
                        if let Some(run) = self.runs.get_mut(&name) {
                            run.state = Some(RunState::Skipped);
                            run.error = Some(reason.clone());
                        }
                        info!(task = %name, reason = %reason, "task skipped");
                        skipped_any = true;
                    }
                }
            }

            if !skipped_any {
                break;
            }
        }

        self.maybe_finish_run();
        ready
    }

    fn classify(&self, task: &str) -> Readiness {
        for dep in self.graph.dependencies_of(task) {
            let Some(dep_run) = self.runs.get(dep) else {
                // Unreachable with a validated graph.
                return Readiness::Unsatisfiable(format!(
                    "prerequisite '{dep}' is not registered"
                ));
            };

            match dep_run.state {
                Some(RunState::Succeeded) => {}
                Some(RunState::Failed) => {
                    return Readiness::Unsatisfiable(format!(
                        "prerequisite '{dep}' failed"
                    ));
                }
                Some(RunState::Skipped) => {
                    return Readiness::Unsatisfiable(format!(
                        "prerequisite '{dep}' was skipped"
                    ));
                }
                Some(RunState::Pending) | Some(RunState::Ready) | Some(RunState::Running) => {
                    return Readiness::Blocked;
                }
                None => {
                    // Not part of this run; rely on history.
                    if dep_run.last_successful_run.is_none() {
                        return Readiness::Unsatisfiable(format!(
                            "prerequisite '{dep}' has never succeeded"
                        ));
                    }
                }
            }
        }
        Readiness::Ready
    }

    /// Snapshot a [`RunReport`] and go idle once no participating task is in
    /// a non-terminal state.
    fn maybe_finish_run(&mut self) {
        let Some(run_id) = self.current_run_id else {
            return;
        };

        let any_active = self
            .runs
            .values()
            .any(|r| matches!(r.state, Some(s) if !s.is_terminal()));
        if any_active {
            return;
        }

        let records: Vec<RunRecord> = self
            .graph
            .tasks()
            .filter_map(|name| {
                let run = self.runs.get(name)?;
                let state = run.state?;
                Some(RunRecord {
                    task: name.to_string(),
                    state,
                    started_at: run.started_at,
                    inputs: run.inputs.clone(),
                    error: run.error.clone(),
                })
            })
            .collect();

        info!(run_id, tasks = records.len(), "run finished");
        self.finished = Some(RunReport { run_id, records });
        self.current_run_id = None;
    }
}

enum Readiness {
    Ready,
    Blocked,
    Unsatisfiable(String),
}
