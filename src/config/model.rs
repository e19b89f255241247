// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [project]
/// root = "."
/// dist = "build"
///
/// [watch]
/// debounce_ms = 150
///
/// [entry]
/// build = ["postprocess"]
/// deploy = "upload"
///
/// [task.styles]
/// watch = ["src/scss/**/*.scss"]
///
/// [[task.styles.steps]]
/// transform = "exec"
/// inputs = ["src/scss/*.scss", "!src/scss/_*.scss"]
/// dest = "build/css"
/// options = { command = "scssc {inputs} -o {dest}" }
/// ```
///
/// All sections except `[task.*]` are optional and have defaults. The struct
/// is constructed once at startup and never mutated afterwards; everything
/// downstream borrows it.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    /// Project layout from `[project]`.
    #[serde(default)]
    pub project: ProjectSection,

    /// Watch-mode behaviour from `[watch]`.
    #[serde(default)]
    pub watch: WatchSection,

    /// Named entry points from `[entry]`.
    #[serde(default)]
    pub entry: EntrySection,

    /// Remote sync configuration from `[deploy]`, if any.
    #[serde(default)]
    pub deploy: Option<DeploySection>,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// Directory all glob patterns resolve against. Relative paths are
    /// interpreted against the config file's directory.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Shared output tree, relative to `root`.
    #[serde(default = "default_dist")]
    pub dist: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_dist() -> PathBuf {
    PathBuf::from("build")
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            dist: default_dist(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Debounce interval for coalescing bursts of change events, applied
    /// uniformly to every watch subscription.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    150
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// `[entry]` section: maps the CLI entry points to root tasks.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EntrySection {
    /// Root tasks for the one-shot `build` entry. Empty means "every task".
    #[serde(default)]
    pub build: Vec<String>,

    /// The single task representing the remote-sync step for `deploy`.
    #[serde(default)]
    pub deploy: Option<String>,

    /// Root tasks for the initial build in watch mode. Empty falls back to
    /// `entry.build`.
    #[serde(default)]
    pub watch: Vec<String>,
}

/// `[deploy]` section.
///
/// Credentials live in a separate settings file (the `settings` path) so
/// they never sit next to the task graph.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploySection {
    /// Path to the external settings file (host, user, password), relative
    /// to the config file's directory.
    pub settings: PathBuf,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaskConfig {
    /// Dependency list: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,

    /// Glob patterns that, on change, re-run this task (and its dependents).
    /// Patterns prefixed with `!` exclude.
    #[serde(default)]
    pub watch: Vec<String>,

    /// Ordered step sequence executed when the task runs.
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

/// One step of a task: a pure description of a file transform.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StepConfig {
    /// Transform identifier, resolved against the transform registry
    /// (built-ins: `copy`, `exec`, `sync`).
    pub transform: String,

    /// Input glob patterns; `!`-prefixed patterns exclude.
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Output destination directory, relative to the project root.
    pub dest: PathBuf,

    /// Transform-specific options.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}
