// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::ConfigFile;
use crate::config::validate::validate_config;
use crate::errors::ConfigError;
use crate::step::TransformRegistry;

/// Load a configuration file from a path. TOML deserialization only; use
/// [`load_and_validate`] for the semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&contents).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a configuration file and validate it against the transform
/// registry. Recommended entry point: the returned config is guaranteed to
/// describe an acyclic graph with resolvable patterns and known transforms.
pub fn load_and_validate(
    path: impl AsRef<Path>,
    registry: &TransformRegistry,
) -> Result<ConfigFile, ConfigError> {
    let config = load_from_path(&path)?;
    validate_config(&config, registry)?;
    Ok(config)
}
