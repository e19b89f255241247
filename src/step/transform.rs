// src/step/transform.rs

//! Pluggable transform abstraction.
//!
//! A [`Transform`] is the uniform interface behind which every concrete
//! file-processing operation lives. The orchestrator never knows what a
//! transform does to file contents; it only routes resolved input sets in
//! and collects produced paths (or a side effect) out.
//!
//! Built-ins:
//! - `copy`: pass input files through to the destination directory.
//! - `exec`: invoke an external command over the input set. This is the
//!   hook for style compilers, template renderers, bundlers and the like.
//! - `sync`: mirror inputs into a destination tree, skipping files whose
//!   destination is at least as new as the source.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::deploy::{self, SyncOutcome};

/// Everything a transform gets to see for one step invocation.
pub struct StepContext<'a> {
    /// Owning task, for diagnostics.
    pub task: &'a str,
    /// Resolved input files, absolute, in deterministic order.
    pub inputs: &'a [PathBuf],
    /// Destination directory, absolute. Exists by the time `apply` runs.
    pub dest: &'a Path,
    /// Transform-specific options from the step configuration.
    pub options: &'a BTreeMap<String, String>,
    /// Project root all relative paths are interpreted against.
    pub project_root: &'a Path,
}

type ApplyFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<PathBuf>>> + Send + 'a>>;

/// A single file transform, invoked by the step runner.
///
/// Implementations own no mutable state; they are invoked, not scheduled.
pub trait Transform: Send + Sync {
    /// Identifier steps refer to in their `transform` field.
    fn id(&self) -> &'static str;

    /// Consume the resolved input set and produce output paths (possibly
    /// empty, when the work is a pure side effect).
    fn apply<'a>(&'a self, ctx: StepContext<'a>) -> ApplyFuture<'a>;
}

/// Registry mapping transform identifiers to implementations.
///
/// Validated against at configuration time, so an unknown transform id never
/// survives to a run.
#[derive(Clone, Default)]
pub struct TransformRegistry {
    map: HashMap<&'static str, Arc<dyn Transform>>,
}

impl TransformRegistry {
    /// Registry with the built-in transforms.
    pub fn builtin() -> Self {
        let mut reg = Self::default();
        reg.register(Arc::new(CopyTransform));
        reg.register(Arc::new(ExecTransform));
        reg.register(Arc::new(SyncTransform));
        reg
    }

    pub fn register(&mut self, transform: Arc<dyn Transform>) {
        self.map.insert(transform.id(), transform);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.map.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Transform>> {
        self.map.get(id).cloned()
    }
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("ids", &self.map.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// `copy`: each input file lands in the destination under its own name.
pub struct CopyTransform;

impl Transform for CopyTransform {
    fn id(&self) -> &'static str {
        "copy"
    }

    fn apply<'a>(&'a self, ctx: StepContext<'a>) -> ApplyFuture<'a> {
        Box::pin(async move {
            let mut outputs = Vec::with_capacity(ctx.inputs.len());
            for input in ctx.inputs {
                let name = input
                    .file_name()
                    .ok_or_else(|| anyhow!("input without a file name: {input:?}"))?;
                let target = ctx.dest.join(name);
                tokio::fs::copy(input, &target)
                    .await
                    .with_context(|| format!("copying {input:?} to {target:?}"))?;
                debug!(task = %ctx.task, from = ?input, to = ?target, "copied file");
                outputs.push(target);
            }
            Ok(outputs)
        })
    }
}

/// `exec`: run an external command over the resolved input set.
///
/// The `command` option is required; `{inputs}` expands to the
/// space-separated input paths and `{dest}` to the destination directory.
pub struct ExecTransform;

impl Transform for ExecTransform {
    fn id(&self) -> &'static str {
        "exec"
    }

    fn apply<'a>(&'a self, ctx: StepContext<'a>) -> ApplyFuture<'a> {
        Box::pin(async move {
            let template = ctx
                .options
                .get("command")
                .ok_or_else(|| anyhow!("exec transform requires a 'command' option"))?;

            let inputs_arg = ctx
                .inputs
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(" ");
            let command = template
                .replace("{inputs}", &inputs_arg)
                .replace("{dest}", &ctx.dest.to_string_lossy());

            info!(task = %ctx.task, cmd = %command, "running external command");

            let mut cmd = if cfg!(windows) {
                let mut c = Command::new("cmd");
                c.arg("/C").arg(&command);
                c
            } else {
                let mut c = Command::new("sh");
                c.arg("-c").arg(&command);
                c
            };

            cmd.current_dir(ctx.project_root)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            let mut child = cmd
                .spawn()
                .with_context(|| format!("spawning command for task '{}'", ctx.task))?;

            // Drain both pipes so buffers never fill; surface lines at debug.
            if let Some(stdout) = child.stdout.take() {
                spawn_line_logger(ctx.task.to_string(), "stdout", stdout);
            }
            if let Some(stderr) = child.stderr.take() {
                spawn_line_logger(ctx.task.to_string(), "stderr", stderr);
            }

            let status = child
                .wait()
                .await
                .with_context(|| format!("waiting for command of task '{}'", ctx.task))?;

            if !status.success() {
                bail!(
                    "command exited with code {} for task '{}'",
                    status.code().unwrap_or(-1),
                    ctx.task
                );
            }

            // The command writes under `dest` itself; outputs are a side effect.
            Ok(Vec::new())
        })
    }
}

fn spawn_line_logger<R>(task: String, stream: &'static str, reader: R)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(task = %task, stream, "{}", line);
        }
    });
}

/// `sync`: mirror inputs into the destination tree, newer-only.
///
/// Each input's path relative to the `base` option (default: the project
/// root) is preserved under `dest`. Files whose destination timestamp is
/// newer than or equal to the source are skipped.
pub struct SyncTransform;

impl Transform for SyncTransform {
    fn id(&self) -> &'static str {
        "sync"
    }

    fn apply<'a>(&'a self, ctx: StepContext<'a>) -> ApplyFuture<'a> {
        Box::pin(async move {
            let base = match ctx.options.get("base") {
                Some(b) => ctx.project_root.join(b),
                None => ctx.project_root.to_path_buf(),
            };
            let base = base
                .canonicalize()
                .with_context(|| format!("resolving sync base {base:?}"))?;

            let mut transferred = Vec::new();
            let mut skipped = 0usize;

            for input in ctx.inputs {
                let rel = input.strip_prefix(&base).with_context(|| {
                    format!("input {input:?} is outside sync base {base:?}")
                })?;
                let target = ctx.dest.join(rel);

                match deploy::sync_file(input, &target)? {
                    SyncOutcome::Transferred => transferred.push(target),
                    SyncOutcome::SkippedUpToDate => skipped += 1,
                }
            }

            info!(
                task = %ctx.task,
                transferred = transferred.len(),
                skipped,
                "sync step finished"
            );
            Ok(transferred)
        })
    }
}
