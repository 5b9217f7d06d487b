//! Config file loading and precedence.
//!
//! Precedence is flags > config file > environment (API key only) >
//! defaults. The result is a [`Settings`] for the whole process plus, for
//! `download`, a [`DownloadConfig`] and [`CandidateSource`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use civitdl_core::config::{
    DEFAULT_API_DELAY_MS, DEFAULT_API_TIMEOUT_SECS, DEFAULT_BASE_URL, DEFAULT_CONCURRENCY,
    DEFAULT_DATABASE_NAME, DEFAULT_INITIAL_RETRY_DELAY_MS, DEFAULT_MAX_RETRIES,
    DEFAULT_MODEL_INFO_PATH_PATTERN, DEFAULT_PAGE_LIMIT, DEFAULT_SAVE_PATH,
    DEFAULT_VERSION_PATH_PATTERN,
};
use civitdl_core::{
    DownloadConfig, FilterOptions, ModelQuery, Period, RetryPolicy, SidecarOptions, SortOrder,
};
use civitdl_download::CandidateSource;

use crate::commands::DownloadArgs;
use crate::error::CliError;
use crate::logging::{DEFAULT_LOG_LEVEL, LogFormat};
use crate::parser::Cli;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "civitdl.toml";

pub const API_KEY_ENV: &str = "CIVITAI_API_KEY";

/// Contents of the TOML config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub save_path: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub page_limit: Option<u32>,
    pub api_delay_ms: Option<u64>,
    pub api_timeout_secs: Option<u64>,
    pub max_retries: Option<i32>,
    pub initial_retry_delay_ms: Option<i64>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,

    pub concurrency: Option<usize>,
    pub version_path_pattern: Option<String>,
    pub model_info_path_pattern: Option<String>,
    pub limit: Option<usize>,
    pub max_pages: Option<u32>,
    pub sort: Option<String>,
    pub period: Option<String>,
    pub nsfw: Option<bool>,
    pub model_types: Option<Vec<String>>,
    pub base_models: Option<Vec<String>>,
    pub primary_only: Option<bool>,
    pub pruned: Option<bool>,
    pub fp16: Option<bool>,
    pub ignore_base_models: Option<Vec<String>>,
    pub ignore_filename_strings: Option<Vec<String>>,
    pub metadata: Option<bool>,
    pub model_info: Option<bool>,
    pub version_images: Option<bool>,
    pub model_images: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&text)
            .map_err(|e| CliError::Config(format!("{}: {e}", path.display())).into())
    }

    /// The explicit file, which must exist, or `civitdl.toml` in the
    /// working directory when present.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    tracing::debug!(path = %default.display(), "using config file");
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

/// Process-wide settings after precedence is applied.
#[derive(Debug, Clone)]
pub struct Settings {
    pub save_root: PathBuf,
    pub database_path: PathBuf,
    pub api_key: Option<String>,
    pub base_url: String,
    pub page_limit: u32,
    pub api_delay: Duration,
    pub api_timeout: Duration,
    pub retry: RetryPolicy,
    pub log_level: String,
    pub log_format: LogFormat,
    pub log_api: bool,
    /// Kept for per-command defaults.
    pub file: FileConfig,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Flag list when given, else the file's, else empty.
fn pick_list(flag: &[String], file: Option<&Vec<String>>) -> Vec<String> {
    let source = if flag.is_empty() {
        file.map_or(&[][..], Vec::as_slice)
    } else {
        flag
    };
    source
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// A set flag wins; otherwise the file decides.
fn pick_flag(flag: bool, file: Option<bool>) -> bool {
    flag || file.unwrap_or(false)
}

impl Settings {
    pub fn resolve(cli: &Cli, file: FileConfig, env_api_key: Option<String>) -> Self {
        let save_root = cli
            .save_path
            .clone()
            .or_else(|| file.save_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SAVE_PATH));
        let database_path = file
            .database_path
            .clone()
            .unwrap_or_else(|| save_root.join(DEFAULT_DATABASE_NAME));
        let api_key = non_blank(cli.api_key.clone())
            .or_else(|| non_blank(file.api_key.clone()))
            .or_else(|| non_blank(env_api_key));

        Self {
            database_path,
            api_key,
            base_url: file
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            page_limit: file.page_limit.unwrap_or(DEFAULT_PAGE_LIMIT),
            api_delay: Duration::from_millis(
                cli.api_delay
                    .or(file.api_delay_ms)
                    .unwrap_or(DEFAULT_API_DELAY_MS),
            ),
            api_timeout: Duration::from_secs(
                cli.api_timeout
                    .or(file.api_timeout_secs)
                    .unwrap_or(DEFAULT_API_TIMEOUT_SECS),
            ),
            retry: RetryPolicy::new(
                file.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
                file.initial_retry_delay_ms
                    .unwrap_or(DEFAULT_INITIAL_RETRY_DELAY_MS),
            ),
            log_level: cli
                .log_level
                .clone()
                .or_else(|| file.log_level.clone())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_format: cli.log_format.or(file.log_format).unwrap_or_default(),
            log_api: cli.log_api,
            save_root,
            file,
        }
    }

    /// Pipeline configuration for one `download` invocation.
    pub fn download_config(&self, args: &DownloadArgs) -> DownloadConfig {
        let file = &self.file;
        DownloadConfig {
            save_root: self.save_root.clone(),
            concurrency: args
                .concurrency
                .or(file.concurrency)
                .unwrap_or(DEFAULT_CONCURRENCY),
            version_path_pattern: file
                .version_path_pattern
                .clone()
                .unwrap_or_else(|| DEFAULT_VERSION_PATH_PATTERN.to_string()),
            model_info_path_pattern: file
                .model_info_path_pattern
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL_INFO_PATH_PATTERN.to_string()),
            user_limit: args.limit.or(file.limit).unwrap_or(0),
            max_pages: args.max_pages.or(file.max_pages).unwrap_or(0),
            api_delay: self.api_delay,
            filter: FilterOptions {
                primary_only: pick_flag(args.primary_only, file.primary_only),
                pruned: pick_flag(args.pruned, file.pruned),
                fp16: pick_flag(args.fp16, file.fp16),
                ignore_base_models: pick_list(
                    &args.ignore_base_models,
                    file.ignore_base_models.as_ref(),
                ),
                ignore_filename_strings: pick_list(
                    &args.ignore_filename_strings,
                    file.ignore_filename_strings.as_ref(),
                ),
                model_types: pick_list(&args.model_types, file.model_types.as_ref()),
            },
            sidecars: SidecarOptions {
                metadata: pick_flag(args.metadata, file.metadata),
                model_info: pick_flag(args.model_info, file.model_info),
                version_images: pick_flag(args.version_images, file.version_images),
                model_images: pick_flag(args.model_images, file.model_images),
            },
            meta_only: args.meta_only,
        }
    }

    /// Where `download` takes its candidates from.
    pub fn candidate_source(&self, args: &DownloadArgs) -> CandidateSource {
        if let Some(id) = args.model_version_id {
            return CandidateSource::VersionId(id);
        }
        if let Some(id) = args.model_id {
            return CandidateSource::ModelId {
                id,
                all_versions: args.all_versions,
            };
        }

        let file = &self.file;
        let primary_only = pick_flag(args.primary_only, file.primary_only);
        CandidateSource::Query(ModelQuery {
            query: non_blank(args.query.clone()),
            tag: non_blank(args.tag.clone()),
            username: non_blank(args.username.clone()),
            types: pick_list(&args.model_types, file.model_types.as_ref()),
            base_models: pick_list(&args.base_models, file.base_models.as_ref()),
            sort: args
                .sort
                .as_deref()
                .or(file.sort.as_deref())
                .map(SortOrder::parse_or_default)
                .unwrap_or_default(),
            period: args
                .period
                .as_deref()
                .or(file.period.as_deref())
                .map(Period::parse_or_default)
                .unwrap_or_default(),
            primary_file_only: primary_only,
            nsfw: if args.nsfw { Some(true) } else { file.nsfw },
            ..ModelQuery::default()
        })
    }
}
