// src/errors.rs

//! Crate-wide error taxonomy.
//!
//! Configuration problems (bad globs, unknown dependencies, cycles) are
//! detected before any task runs and surface as [`ConfigError`]. Failures
//! during a run are captured per step as [`StepError`] and aggregated per
//! run as [`RunFailure`]; they never crash the process in watch mode.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors detected at configuration / graph-validation time.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Invalid(String),

    #[error("invalid glob pattern '{pattern}' in task '{task}': {source}")]
    BadGlob {
        task: String,
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("task '{task}' is already registered with a different definition")]
    DuplicateTask { task: String },

    #[error("task '{task}' depends on unknown task '{missing}'")]
    UnknownDependency { task: String, missing: String },

    #[error("cycle detected in task graph: {}", format_cycle(.cycle))]
    Cycle { cycle: Vec<String> },

    #[error("step {step_index} of task '{task}' uses unknown transform '{transform}'")]
    UnknownTransform {
        task: String,
        step_index: usize,
        transform: String,
    },

    #[error("reading config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing TOML config from {path:?}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

fn format_cycle(cycle: &[String]) -> String {
    let mut parts = cycle.to_vec();
    if let Some(first) = cycle.first() {
        parts.push(first.clone());
    }
    parts.join(" -> ")
}

/// A single transform failed while executing a task's step sequence.
///
/// Carries enough context to report "which task, which step, why" without
/// aborting unrelated task branches.
#[derive(Error, Debug)]
#[error("step {step_index} of task '{task}' failed: {cause}")]
pub struct StepError {
    pub task: String,
    pub step_index: usize,
    #[source]
    pub cause: anyhow::Error,
}

/// Filesystem watch setup failure. Fatal to watch-mode startup only.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("failed to set up filesystem watch: {0}")]
    Setup(#[from] notify::Error),
}

/// Deploy settings / transfer failure. Fatal to the deploy entry point only.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("deploy settings at {path:?}: {cause}")]
    Settings { path: PathBuf, cause: String },

    #[error("transfer failed for {path:?}: {source}")]
    Transfer {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Aggregate outcome of a failed one-shot run: every task that failed plus
/// every task skipped because a prerequisite failed.
#[derive(Debug)]
pub struct RunFailure {
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} task(s) failed [{}], {} skipped [{}]",
            self.failed.len(),
            self.failed.join(", "),
            self.skipped.len(),
            self.skipped.join(", ")
        )
    }
}

impl std::error::Error for RunFailure {}
