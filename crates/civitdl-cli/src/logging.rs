//! Tracing subscriber setup.

use anyhow::{Result, anyhow};
use clap::ValueEnum;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Filter directives for a base level, optionally with catalog requests
/// raised to debug.
pub fn filter_directives(level: &str, log_api: bool) -> String {
    let level = level.trim();
    let level = if level.is_empty() { DEFAULT_LOG_LEVEL } else { level };
    if log_api {
        format!("{level},civitdl.api=debug")
    } else {
        level.to_string()
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `level` when set.
///
/// Logs go to stderr so the progress display owns stdout.
pub fn init(level: &str, format: LogFormat, log_api: bool) -> Result<()> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives)?,
        _ => EnvFilter::try_new(filter_directives(level, log_api))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    match format {
        LogFormat::Text => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| anyhow!("failed to initialise logging: {e}"))
}
