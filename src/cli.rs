// src/cli.rs

//! Command-line surface, built with `clap` derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "sitepipe",
    version,
    about = "Task-graph build pipeline: glob-routed steps, file watching, incremental re-runs."
)]
pub struct CliArgs {
    /// TOML config file describing the task graph.
    #[arg(short, long, value_name = "PATH", default_value = "Sitepipe.toml")]
    pub config: PathBuf,

    /// Logging verbosity. Falls back to SITEPIPE_LOG, then "info".
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the config and print the task graph without executing.
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<EntryCommand>,
}

/// Entry points, each mapping to root tasks declared in `[entry]`.
#[derive(Debug, Clone, Subcommand)]
pub enum EntryCommand {
    /// Build once, then re-run affected tasks as watched files change
    /// (the default when no subcommand is given).
    Watch,
    /// Run the one-shot build graph and exit.
    Build,
    /// Run the remote-sync task and exit.
    Deploy,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
