// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TaskName, TriggerReason};
use crate::errors::WatchError;
use crate::glob::relative_str;
use crate::watch::debounce::spawn_debouncer;
use crate::watch::patterns::WatchProfile;

/// Handle owning the filesystem watch subscriptions.
///
/// The underlying watcher stays alive for as long as this handle does;
/// releasing it tears down every subscription, so the handle must live
/// until process shutdown and be released then.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

impl WatcherHandle {
    /// Release all filesystem watch subscriptions.
    pub fn unsubscribe_all(self) {
        drop(self);
    }
}

/// Spawn a filesystem watcher observing `root` recursively.
///
/// Change events are debounced by `debounce`, then each batch is matched
/// against the per-task watch profiles and forwarded to the runtime as one
/// `TasksTriggered` batch. Setup failure is fatal to watch-mode startup;
/// everything after that is recovered and logged.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    profiles: Vec<WatchProfile>,
    debounce: Duration,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle, WatchError> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    let profiles = Arc::new(profiles);

    // Channel from the blocking notify callback into the async world.
    let (raw_tx, raw_rx) = mpsc::unbounded_channel::<PathBuf>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !is_change(&event.kind) {
                    return;
                }
                for path in event.paths {
                    if let Err(err) = raw_tx.send(path) {
                        // tracing isn't reliable inside the notify callback.
                        eprintln!("sitepipe: failed to forward change event: {err}");
                    }
                }
            }
            Err(err) => {
                eprintln!("sitepipe: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!(root = ?root, "file watcher started");

    let (batch_tx, mut batch_rx) = mpsc::channel::<Vec<PathBuf>>(16);
    spawn_debouncer(debounce, raw_rx, batch_tx);

    // Async task that turns debounced path batches into task trigger batches.
    tokio::spawn(async move {
        while let Some(paths) = batch_rx.recv().await {
            let mut triggered: BTreeSet<TaskName> = BTreeSet::new();

            for path in &paths {
                let Some(rel) = relative_str(&root, path) else {
                    debug!(?path, root = ?root, "change outside project root; ignoring");
                    continue;
                };
                for profile in profiles.iter() {
                    if profile.matches(&rel) {
                        debug!(task = %profile.name(), path = %rel, "watch match");
                        triggered.insert(profile.name().to_string());
                    }
                }
            }

            if triggered.is_empty() {
                continue;
            }

            let tasks: Vec<TaskName> = triggered.into_iter().collect();
            if let Err(err) = runtime_tx
                .send(RuntimeEvent::TasksTriggered {
                    tasks,
                    reason: TriggerReason::FileWatch,
                })
                .await
            {
                warn!("failed to send trigger batch to runtime: {err}");
                // Runtime gone; no point keeping the loop alive.
                return;
            }
        }

        debug!("watcher trigger loop ended");
    });

    Ok(WatcherHandle { _inner: watcher })
}

/// Only create/modify/remove qualify as changes; access events do not.
fn is_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}
