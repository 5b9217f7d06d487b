//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;
use crate::logging::LogFormat;

/// Download models and their sidecars from the Civitai catalog.
///
/// Global options override the config file; subcommands carry their own
/// flags.
#[derive(Parser, Debug)]
#[command(name = "civitdl")]
#[command(about = "Download models from the Civitai catalog")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ./civitdl.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Root directory for downloads and the database
    #[arg(long = "save-path", global = true, value_name = "DIR")]
    pub save_path: Option<PathBuf>,

    /// API key; falls back to the config file, then CIVITAI_API_KEY
    #[arg(long = "api-key", global = true, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Pause between catalog page requests
    #[arg(long = "api-delay", global = true, value_name = "MS")]
    pub api_delay: Option<u64>,

    /// Per-request timeout
    #[arg(long = "api-timeout", global = true, value_name = "SECS")]
    pub api_timeout: Option<u64>,

    /// Log level or filter directive (overridden by RUST_LOG)
    #[arg(long = "log-level", global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long = "log-format", global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Log every catalog request at debug level
    #[arg(long = "log-api", global = true)]
    pub log_api: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args_after_subcommand() {
        let cli = Cli::parse_from([
            "civitdl",
            "clean",
            "--save-path",
            "/tmp/models",
            "--log-format",
            "json",
            "--log-api",
        ]);
        assert_eq!(cli.save_path, Some(PathBuf::from("/tmp/models")));
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert!(cli.log_api);
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["civitdl"]).is_err());
    }
}
