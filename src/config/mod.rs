// src/config/mod.rs

//! Configuration loading, data model, and validation.
//!
//! - [`model`]: serde structs mirroring the TOML config file.
//! - [`loader`]: reading and parsing.
//! - [`validate`]: semantic checks performed before any task runs.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    ConfigFile, DeploySection, EntrySection, ProjectSection, StepConfig, TaskConfig, WatchSection,
};
pub use validate::validate_config;
