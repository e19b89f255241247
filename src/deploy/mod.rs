// src/deploy/mod.rs

//! Remote deploy support: external credential settings and newer-only
//! file sync.
//!
//! Credentials are an external collaborator (a separate TOML file named by
//! `[deploy].settings`), never embedded in the task graph. The built-in
//! transfer targets a local/mounted destination tree; a network transport
//! would implement the same newer-only contract behind the `sync` transform.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use serde::Deserialize;
use tracing::debug;

use crate::errors::DeployError;

/// Remote host settings loaded from the external settings file.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploySettings {
    pub host: String,
    pub user: String,
    pub password: String,
}

/// Load and validate deploy settings.
///
/// Missing file, malformed TOML, or empty fields are all a [`DeployError`]:
/// the deploy entry point must fail before any transfer starts.
pub fn load_settings(path: &Path) -> Result<DeploySettings, DeployError> {
    let contents = fs::read_to_string(path).map_err(|e| DeployError::Settings {
        path: path.to_path_buf(),
        cause: e.to_string(),
    })?;

    let settings: DeploySettings =
        toml::from_str(&contents).map_err(|e| DeployError::Settings {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })?;

    for (field, value) in [
        ("host", &settings.host),
        ("user", &settings.user),
        ("password", &settings.password),
    ] {
        if value.trim().is_empty() {
            return Err(DeployError::Settings {
                path: path.to_path_buf(),
                cause: format!("field '{field}' must not be empty"),
            });
        }
    }

    Ok(settings)
}

/// Outcome of syncing one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Transferred,
    SkippedUpToDate,
}

/// Copy `src` to `dest` only if `dest` is missing or strictly older.
///
/// A destination timestamp newer than or equal to the source counts as up
/// to date and is skipped. Intermediate destination directories are created
/// as needed.
pub fn sync_file(src: &Path, dest: &Path) -> Result<SyncOutcome, DeployError> {
    let src_mtime = modified(src)?;

    if dest.exists() {
        let dest_mtime = modified(dest)?;
        if dest_mtime >= src_mtime {
            debug!(src = ?src, dest = ?dest, "destination up to date; skipping");
            return Ok(SyncOutcome::SkippedUpToDate);
        }
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|source| DeployError::Transfer {
            path: dest.to_path_buf(),
            source,
        })?;
    }

    fs::copy(src, dest).map_err(|source| DeployError::Transfer {
        path: dest.to_path_buf(),
        source,
    })?;

    debug!(src = ?src, dest = ?dest, "transferred file");
    Ok(SyncOutcome::Transferred)
}

fn modified(path: &Path) -> Result<SystemTime, DeployError> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| DeployError::Transfer {
            path: path.to_path_buf(),
            source,
        })
}
