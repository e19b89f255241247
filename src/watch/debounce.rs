// src/watch/debounce.rs

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

/// Coalesce bursts of raw change paths into batches.
///
/// The first path opens a window of `interval`; every further path arriving
/// inside the window joins the same batch. When the window closes the batch
/// is flushed downstream as one deduplicated set. Editors that write a file
/// several times in quick succession therefore produce one trigger, not
/// many.
pub fn spawn_debouncer(
    interval: Duration,
    mut raw_rx: mpsc::UnboundedReceiver<PathBuf>,
    batch_tx: mpsc::Sender<Vec<PathBuf>>,
) {
    tokio::spawn(async move {
        while let Some(first) = raw_rx.recv().await {
            let mut batch: BTreeSet<PathBuf> = BTreeSet::new();
            batch.insert(first);

            let window = tokio::time::sleep(interval);
            tokio::pin!(window);

            loop {
                tokio::select! {
                    _ = &mut window => break,
                    next = raw_rx.recv() => match next {
                        Some(path) => {
                            batch.insert(path);
                        }
                        None => break,
                    },
                }
            }

            let paths: Vec<PathBuf> = batch.into_iter().collect();
            debug!(paths = paths.len(), "debounce window closed; flushing batch");
            if batch_tx.send(paths).await.is_err() {
                // Downstream gone; nothing left to debounce for.
                return;
            }
        }

        debug!("debouncer input closed");
    });
}
