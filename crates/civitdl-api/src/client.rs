//! Catalog client over an HTTP backend.

use crate::config::CatalogClientConfig;
use crate::error::ApiResult;
use crate::http::{Fetcher, HttpBackend};

/// Default catalog client using the reqwest fetcher.
pub type DefaultCatalogClient = CatalogClient<Fetcher>;

/// Client for the catalog API.
///
/// Generic over an HTTP backend so tests can substitute canned JSON. Use
/// [`DefaultCatalogClient`] in production code and talk to it through the
/// `CatalogPort` trait.
pub struct CatalogClient<B: HttpBackend> {
    pub(crate) backend: B,
    pub(crate) base_url: String,
    pub(crate) page_limit: u32,
}

impl DefaultCatalogClient {
    pub fn new(config: &CatalogClientConfig) -> ApiResult<Self> {
        Ok(Self::with_fetcher(Fetcher::new(config)?, config))
    }

    /// Build a client around an existing fetcher so downloads and catalog
    /// calls share one connection pool.
    pub fn with_fetcher(fetcher: Fetcher, config: &CatalogClientConfig) -> Self {
        Self {
            backend: fetcher,
            base_url: config.base_url.clone(),
            page_limit: config.page_limit,
        }
    }

    pub const fn fetcher(&self) -> &Fetcher {
        &self.backend
    }
}

impl<B: HttpBackend> CatalogClient<B> {
    /// Create a client with a custom backend.
    #[cfg(test)]
    pub(crate) fn with_backend(backend: B, base_url: &str) -> Self {
        Self {
            backend,
            base_url: base_url.to_string(),
            page_limit: civitdl_core::config::DEFAULT_PAGE_LIMIT,
        }
    }
}
