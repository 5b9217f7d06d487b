//! Fully-resolved configuration records.
//!
//! The CLI merges flags, the config file and defaults into these records;
//! the pipeline only ever sees the result.

use std::path::PathBuf;
use std::time::Duration;

use crate::ports::CoreError;

pub const DEFAULT_SAVE_PATH: &str = "downloads";
pub const DEFAULT_DATABASE_NAME: &str = "civitdl.db";
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_API_DELAY_MS: u64 = 200;
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_RETRIES: i32 = 3;
pub const DEFAULT_INITIAL_RETRY_DELAY_MS: i64 = 1000;
pub const DEFAULT_VERSION_PATH_PATTERN: &str = "{modelType}/{modelName}/{baseModel}";
pub const DEFAULT_MODEL_INFO_PATH_PATTERN: &str = "{modelType}/{modelName}";
pub const DEFAULT_BASE_URL: &str = "https://civitai.com/api/v1";
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Substitute delay when the configured one is not positive.
const FALLBACK_RETRY_DELAY_MS: u64 = 500;

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_INITIAL_RETRY_DELAY_MS)
    }
}

impl RetryPolicy {
    /// Build a policy from raw settings.
    ///
    /// Negative retries become 0; a non-positive delay becomes 500 ms.
    pub fn new(max_retries: i32, initial_delay_ms: i64) -> Self {
        let max_retries = u32::try_from(max_retries).unwrap_or(0);
        let delay_ms = u64::try_from(initial_delay_ms)
            .ok()
            .filter(|ms| *ms > 0)
            .unwrap_or(FALLBACK_RETRY_DELAY_MS);
        Self {
            max_retries,
            initial_delay: Duration::from_millis(delay_ms),
        }
    }

    /// Total number of attempts.
    pub const fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before attempt `attempt + 1`, where `attempt` is 1-based.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(20);
        self.initial_delay.saturating_mul(1 << exp)
    }

    /// Upper bound on the total backoff for one request.
    pub fn max_total_backoff(&self) -> Duration {
        (1..=self.max_retries).map(|a| self.delay_after(a)).sum()
    }
}

/// File- and model-level candidate predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub primary_only: bool,
    pub pruned: bool,
    pub fp16: bool,
    /// Substrings that reject a version by base model (case-insensitive).
    pub ignore_base_models: Vec<String>,
    /// Substrings that reject a file by name (case-insensitive).
    pub ignore_filename_strings: Vec<String>,
    /// When non-empty, only these model types are kept.
    pub model_types: Vec<String>,
}

/// Which sidecar artifacts to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SidecarOptions {
    pub metadata: bool,
    pub model_info: bool,
    pub version_images: bool,
    pub model_images: bool,
}

impl SidecarOptions {
    pub const fn wants_images(&self) -> bool {
        self.version_images || self.model_images
    }

    pub const fn any(&self) -> bool {
        self.metadata || self.model_info || self.wants_images()
    }
}

/// Everything the download pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadConfig {
    pub save_root: PathBuf,
    pub concurrency: usize,
    pub version_path_pattern: String,
    pub model_info_path_pattern: String,
    /// Maximum jobs per run; 0 means unbounded.
    pub user_limit: usize,
    /// Maximum catalog pages; 0 means unbounded.
    pub max_pages: u32,
    pub api_delay: Duration,
    pub filter: FilterOptions,
    pub sidecars: SidecarOptions,
    /// Write sidecar JSONs only; no store writes and no model downloads.
    pub meta_only: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            save_root: PathBuf::from(DEFAULT_SAVE_PATH),
            concurrency: DEFAULT_CONCURRENCY,
            version_path_pattern: DEFAULT_VERSION_PATH_PATTERN.to_string(),
            model_info_path_pattern: DEFAULT_MODEL_INFO_PATH_PATTERN.to_string(),
            user_limit: 0,
            max_pages: 0,
            api_delay: Duration::from_millis(DEFAULT_API_DELAY_MS),
            filter: FilterOptions::default(),
            sidecars: SidecarOptions::default(),
            meta_only: false,
        }
    }
}

impl DownloadConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.concurrency == 0 {
            return Err(CoreError::Configuration(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.version_path_pattern.trim().is_empty() {
            return Err(CoreError::Configuration(
                "version path pattern cannot be empty".to_string(),
            ));
        }
        if self.model_info_path_pattern.trim().is_empty() {
            return Err(CoreError::Configuration(
                "model info path pattern cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_policy_coerces_bad_values() {
        let policy = RetryPolicy::new(-2, 0);
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.initial_delay, Duration::from_millis(500));
        assert_eq!(policy.attempts(), 1);

        let policy = RetryPolicy::new(3, -10);
        assert_eq!(policy.initial_delay, Duration::from_millis(500));
    }

    #[test]
    fn retry_delays_double() {
        let policy = RetryPolicy::new(3, 100);
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
        // 100 * (2^3 - 1)
        assert_eq!(policy.max_total_backoff(), Duration::from_millis(700));
    }

    #[test]
    fn validation_rejects_zero_concurrency() {
        let config = DownloadConfig {
            concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(DownloadConfig::default().validate().is_ok());
    }

    #[test]
    fn sidecar_image_flags() {
        let opts = SidecarOptions {
            model_images: true,
            ..Default::default()
        };
        assert!(opts.wants_images());
        assert!(!SidecarOptions::default().any());
    }
}
