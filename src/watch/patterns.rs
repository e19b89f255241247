// src/watch/patterns.rs

use std::fmt;

use crate::dag::TaskGraph;
use crate::engine::TaskName;
use crate::errors::ConfigError;
use crate::glob::GlobList;

/// Compiled watch subscription for a single task: the declarative binding
/// of a glob set to a task id.
///
/// Patterns are relative to the project root; the watcher passes relative,
/// forward-slash paths into [`WatchProfile::matches`].
#[derive(Clone)]
pub struct WatchProfile {
    name: TaskName,
    globs: GlobList,
}

impl fmt::Debug for WatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchProfile")
            .field("name", &self.name)
            .field("patterns", &self.globs.patterns())
            .finish()
    }
}

impl WatchProfile {
    /// Task this subscription triggers.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if this task is interested in the given path.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.globs.is_match(rel_path)
    }
}

/// Compile one watch profile per task that declares watch patterns.
///
/// Built from the validated task graph, so every subscription is guaranteed
/// to point at an existing task. Malformed patterns fail here, before watch
/// mode starts.
pub fn build_watch_profiles(graph: &TaskGraph) -> Result<Vec<WatchProfile>, ConfigError> {
    let mut profiles = Vec::new();

    for def in graph.defs() {
        if def.watch.is_empty() {
            continue;
        }
        let globs = GlobList::parse(&def.watch).map_err(|source| ConfigError::BadGlob {
            task: def.name.clone(),
            pattern: source.glob().unwrap_or("<unknown>").to_string(),
            source,
        })?;
        profiles.push(WatchProfile {
            name: def.name.clone(),
            globs,
        });
    }

    Ok(profiles)
}
