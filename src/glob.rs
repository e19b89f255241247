// src/glob.rs

//! Glob pattern lists and filesystem resolution.
//!
//! A pattern list mixes includes and excludes in one ordered sequence;
//! patterns prefixed with `!` exclude. Resolution walks the project root in
//! deterministic (sorted) traversal order and yields the deduplicated
//! absolute paths that match at least one include and no exclude.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;
use walkdir::WalkDir;

/// A compiled include/exclude pattern list.
#[derive(Debug, Clone)]
pub struct GlobList {
    /// Original patterns, kept for diagnostics.
    patterns: Vec<String>,
    includes: GlobSet,
    excludes: GlobSet,
    include_count: usize,
}

impl GlobList {
    /// Compile a pattern list. `!`-prefixed entries become excludes.
    ///
    /// Compilation failures carry the offending pattern so callers can map
    /// them to a configuration error before any task runs.
    pub fn parse(patterns: &[String]) -> Result<Self, globset::Error> {
        let mut includes = GlobSetBuilder::new();
        let mut excludes = GlobSetBuilder::new();
        let mut include_count = 0;

        for pat in patterns {
            if let Some(neg) = pat.strip_prefix('!') {
                excludes.add(Glob::new(neg)?);
            } else {
                includes.add(Glob::new(pat)?);
                include_count += 1;
            }
        }

        Ok(Self {
            patterns: patterns.to_vec(),
            includes: includes.build()?,
            excludes: excludes.build()?,
            include_count,
        })
    }

    /// The original, uncompiled patterns.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// True if the list has no include patterns (it can never match).
    pub fn is_empty(&self) -> bool {
        self.include_count == 0
    }

    /// Match a path relative to the project root, forward-slash separated.
    pub fn is_match(&self, rel_path: &str) -> bool {
        self.includes.is_match(rel_path) && !self.excludes.is_match(rel_path)
    }

    /// Resolve the list against the filesystem under `root`.
    ///
    /// Evaluated at call time, never cached. The returned paths are absolute,
    /// deduplicated, and ordered by sorted directory traversal so repeated
    /// resolutions over an unchanged tree are identical. An empty match set
    /// is valid and yields zero downstream work.
    pub fn resolve(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let root = root
            .canonicalize()
            .with_context(|| format!("resolving project root {root:?}"))?;

        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut matched = Vec::new();

        for entry in WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(rel) = relative_str(&root, path) else {
                continue;
            };
            if self.is_match(&rel) && seen.insert(path.to_path_buf()) {
                matched.push(path.to_path_buf());
            }
        }

        debug!(
            patterns = ?self.patterns,
            matched = matched.len(),
            "resolved glob list"
        );
        Ok(matched)
    }
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Returns `None` if the path is not under `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}
