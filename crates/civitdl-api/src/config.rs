//! Public configuration for the catalog client.

use std::time::Duration;

use civitdl_core::RetryPolicy;
use civitdl_core::config::{DEFAULT_API_TIMEOUT_SECS, DEFAULT_BASE_URL, DEFAULT_PAGE_LIMIT};

/// Configuration for the catalog client and fetcher.
///
/// Use the builder pattern methods to customize the client configuration.
///
/// # Example
///
/// ```
/// use civitdl_api::CatalogClientConfig;
/// use std::time::Duration;
///
/// let config = CatalogClientConfig::new()
///     .with_timeout(Duration::from_secs(60))
///     .with_api_key("secret");
/// ```
#[derive(Debug, Clone)]
pub struct CatalogClientConfig {
    /// Base URL of the API, without a trailing `/models`
    pub(crate) base_url: String,
    /// User agent string for HTTP requests
    pub(crate) user_agent: String,
    /// Per-request timeout
    pub(crate) timeout: Duration,
    /// Sent as a bearer token when present
    pub(crate) api_key: Option<String>,
    pub(crate) retry: RetryPolicy,
    /// Default `limit` for model pages
    pub(crate) page_limit: u32,
}

impl Default for CatalogClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: concat!("civitdl/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
            api_key: None,
            retry: RetryPolicy::default(),
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl CatalogClientConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL for the API.
    ///
    /// Defaults to `https://civitai.com/api/v1`.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the request timeout.
    ///
    /// Defaults to 120 seconds.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set an optional API key; empty strings count as absent.
    #[must_use]
    pub fn with_optional_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub const fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = limit;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
