// src/config/validate.rs

use crate::config::model::ConfigFile;
use crate::dag::TaskGraph;
use crate::errors::ConfigError;
use crate::glob::GlobList;
use crate::step::TransformRegistry;

/// Run semantic validation against a loaded configuration, before any task
/// executes.
///
/// This checks:
/// - there is at least one task
/// - all `after` dependencies refer to existing tasks, and the task graph
///   has no cycles
/// - every watch / input glob pattern compiles
/// - every step's transform id is known to the registry
/// - `[entry]` references existing tasks, and the deploy entry has a
///   `[deploy]` section to work with
pub fn validate_config(cfg: &ConfigFile, registry: &TransformRegistry) -> Result<(), ConfigError> {
    if cfg.task.is_empty() {
        return Err(ConfigError::Invalid(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }

    TaskGraph::from_config(cfg)?.validate()?;
    validate_patterns_and_transforms(cfg, registry)?;
    validate_entries(cfg)?;

    Ok(())
}

fn validate_patterns_and_transforms(
    cfg: &ConfigFile,
    registry: &TransformRegistry,
) -> Result<(), ConfigError> {
    for (name, task) in cfg.task.iter() {
        compile_patterns(name, &task.watch)?;

        for (step_index, step) in task.steps.iter().enumerate() {
            if !registry.contains(&step.transform) {
                return Err(ConfigError::UnknownTransform {
                    task: name.clone(),
                    step_index,
                    transform: step.transform.clone(),
                });
            }
            compile_patterns(name, &step.inputs)?;
        }
    }
    Ok(())
}

fn compile_patterns(task: &str, patterns: &[String]) -> Result<(), ConfigError> {
    GlobList::parse(patterns)
        .map(|_| ())
        .map_err(|source| ConfigError::BadGlob {
            task: task.to_string(),
            pattern: source.glob().unwrap_or("<unknown>").to_string(),
            source,
        })
}

fn validate_entries(cfg: &ConfigFile) -> Result<(), ConfigError> {
    let entry_refs = cfg
        .entry
        .build
        .iter()
        .map(|t| ("build", t))
        .chain(cfg.entry.watch.iter().map(|t| ("watch", t)))
        .chain(cfg.entry.deploy.iter().map(|t| ("deploy", t)));

    for (entry, task) in entry_refs {
        if !cfg.task.contains_key(task) {
            return Err(ConfigError::Invalid(format!(
                "[entry].{entry} references unknown task '{task}'"
            )));
        }
    }

    if cfg.entry.deploy.is_some() && cfg.deploy.is_none() {
        return Err(ConfigError::Invalid(
            "[entry].deploy requires a [deploy] section".to_string(),
        ));
    }

    Ok(())
}
