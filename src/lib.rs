// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod deploy;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod glob;
pub mod logging;
pub mod step;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tracing::info;

use crate::cli::{CliArgs, EntryCommand};
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::{Scheduler, TaskGraph};
use crate::engine::{
    RunSummary, Runtime, RuntimeEvent, RuntimeOptions, TaskName, TriggerReason,
};
use crate::exec::StepExecutorBackend;
use crate::step::{StepRunner, TransformRegistry};
use crate::watch::build_watch_profiles;

/// High-level entry point used by `main.rs`.
///
/// Wires together config loading, the task graph and scheduler, the step
/// executor, and (in watch mode) the file watcher and Ctrl-C handling.
pub async fn run(args: CliArgs) -> Result<()> {
    let registry = Arc::new(TransformRegistry::builtin());
    let cfg = load_and_validate(&args.config, &registry)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let config_dir = config_root_dir(&args.config);
    let project_root = config_dir.join(&cfg.project.root);

    match args.command.clone().unwrap_or(EntryCommand::Watch) {
        EntryCommand::Build => run_build(&cfg, registry, project_root).await,
        EntryCommand::Deploy => run_deploy(&cfg, &config_dir, registry, project_root).await,
        EntryCommand::Watch => run_watch(&cfg, registry, project_root).await,
    }
}

/// One-shot build: the full task graph, leaves first, then exit.
async fn run_build(
    cfg: &ConfigFile,
    registry: Arc<TransformRegistry>,
    project_root: PathBuf,
) -> Result<()> {
    let roots = build_roots(cfg);
    let summary = run_one_shot(cfg, registry, project_root, roots).await?;
    finish_one_shot(summary)
}

/// Deploy: validate the external settings collaborator, then run the
/// configured remote-sync task.
async fn run_deploy(
    cfg: &ConfigFile,
    config_dir: &Path,
    registry: Arc<TransformRegistry>,
    project_root: PathBuf,
) -> Result<()> {
    let deploy_task = cfg
        .entry
        .deploy
        .clone()
        .ok_or_else(|| anyhow!("config has no [entry].deploy task"))?;
    let section = cfg
        .deploy
        .as_ref()
        .ok_or_else(|| anyhow!("config has no [deploy] section"))?;

    let settings = deploy::load_settings(&config_dir.join(&section.settings))?;
    info!(host = %settings.host, user = %settings.user, "deploy settings loaded");

    let summary = run_one_shot(cfg, registry, project_root, vec![deploy_task]).await?;
    finish_one_shot(summary)
}

/// Watch mode: initial build, then incremental re-runs on file changes
/// until Ctrl-C. Task failures are logged and waited out, never fatal.
async fn run_watch(
    cfg: &ConfigFile,
    registry: Arc<TransformRegistry>,
    project_root: PathBuf,
) -> Result<()> {
    let graph = TaskGraph::from_config(cfg)?;
    graph.validate()?;
    let profiles = build_watch_profiles(&graph)?;
    let scheduler = Scheduler::new(graph);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let runner = Arc::new(StepRunner::new(registry, project_root.clone()));
    let exec_tx = exec::spawn_executor(rt_tx.clone(), runner);
    let backend = Box::new(StepExecutorBackend::new(exec_tx));

    let watcher_handle = watch::spawn_watcher(
        project_root,
        profiles,
        Duration::from_millis(cfg.watch.debounce_ms),
        rt_tx.clone(),
    )?;

    // Ctrl-C -> graceful shutdown: refuse new triggers, finish in-flight runs.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    // Initial build before watching.
    let roots = watch_roots(cfg);
    info!(?roots, "initial build tasks for watch mode");
    rt_tx
        .send(RuntimeEvent::TasksTriggered {
            tasks: roots,
            reason: TriggerReason::Entry,
        })
        .await?;

    let runtime = Runtime::new(
        scheduler,
        RuntimeOptions {
            exit_when_idle: false,
        },
        rt_rx,
        backend,
    );
    let _summary = runtime.run().await?;

    watcher_handle.unsubscribe_all();
    Ok(())
}

/// Drive one run of the given root tasks (and their prerequisite closures)
/// to completion and return the summary.
async fn run_one_shot(
    cfg: &ConfigFile,
    registry: Arc<TransformRegistry>,
    project_root: PathBuf,
    roots: Vec<TaskName>,
) -> Result<RunSummary> {
    if roots.is_empty() {
        return Err(anyhow!("no tasks to run for this entry point"));
    }

    let graph = TaskGraph::from_config(cfg)?;
    graph.validate()?;
    let scheduler = Scheduler::new(graph);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let runner = Arc::new(StepRunner::new(registry, project_root));
    let exec_tx = exec::spawn_executor(rt_tx.clone(), runner);
    let backend = Box::new(StepExecutorBackend::new(exec_tx));

    rt_tx
        .send(RuntimeEvent::TasksTriggered {
            tasks: roots,
            reason: TriggerReason::Entry,
        })
        .await?;

    let runtime = Runtime::new(
        scheduler,
        RuntimeOptions {
            exit_when_idle: true,
        },
        rt_rx,
        backend,
    );
    runtime.run().await
}

/// Map a finished one-shot summary to the process outcome: any failed or
/// skipped task is a non-zero exit with the aggregate listing.
fn finish_one_shot(summary: RunSummary) -> Result<()> {
    match summary.failure() {
        None => Ok(()),
        Some(failure) => Err(failure.into()),
    }
}

/// Root tasks for the one-shot build entry: `[entry].build`, or every task
/// except the deploy task when unset.
fn build_roots(cfg: &ConfigFile) -> Vec<TaskName> {
    if !cfg.entry.build.is_empty() {
        return cfg.entry.build.clone();
    }
    cfg.task
        .keys()
        .filter(|name| cfg.entry.deploy.as_deref() != Some(name.as_str()))
        .cloned()
        .collect()
}

/// Root tasks for the initial build in watch mode.
fn watch_roots(cfg: &ConfigFile) -> Vec<TaskName> {
    if !cfg.entry.watch.is_empty() {
        return cfg.entry.watch.clone();
    }
    build_roots(cfg)
}

/// Directory containing the config file, or `.`.
fn config_root_dir(config_path: &Path) -> PathBuf {
    let parent = config_path.parent().unwrap_or(Path::new("."));
    if parent.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        parent.to_path_buf()
    }
}

/// Simple dry-run output: print tasks, prerequisites, steps and watches.
fn print_dry_run(cfg: &ConfigFile) {
    println!("sitepipe dry-run");
    println!("  project.root = {:?}", cfg.project.root);
    println!("  project.dist = {:?}", cfg.project.dist);
    println!("  watch.debounce_ms = {}", cfg.watch.debounce_ms);
    println!();

    println!("tasks ({}):", cfg.task.len());
    for (name, task) in cfg.task.iter() {
        println!("  - {name}");
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        if !task.watch.is_empty() {
            println!("      watch: {:?}", task.watch);
        }
        for (i, step) in task.steps.iter().enumerate() {
            println!(
                "      step {i}: {} {:?} -> {:?}",
                step.transform, step.inputs, step.dest
            );
        }
    }
}
