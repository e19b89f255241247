// src/logging.rs

//! Logging setup.
//!
//! Level resolution order: the `--log-level` flag, then the `SITEPIPE_LOG`
//! environment variable, then `info`.

use std::str::FromStr;

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = match cli_level {
        Some(lvl) => lvl.into(),
        None => std::env::var("SITEPIPE_LOG")
            .ok()
            .and_then(|s| Level::from_str(s.trim()).ok())
            .unwrap_or(Level::INFO),
    };

    fmt().with_max_level(level).with_target(true).init();
    Ok(())
}

impl From<LogLevel> for Level {
    fn from(lvl: LogLevel) -> Self {
        match lvl {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}
