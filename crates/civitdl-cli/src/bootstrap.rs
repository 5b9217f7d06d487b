//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter:
//! - SQLite key/value store (via civitdl-db)
//! - Catalog client and shared fetcher (via civitdl-api)
//! - Download pipeline (via civitdl-download)

use std::sync::Arc;

use anyhow::Result;
use civitdl_api::{CatalogClientConfig, DefaultCatalogClient, Fetcher};
use civitdl_core::{CatalogPort, DownloadConfig, EntryStore, KvStorePort};
use civitdl_db::{SqliteKvStore, setup_database};
use civitdl_download::DownloadPipeline;

use crate::config::Settings;
use crate::error::CliError;

/// Fully composed application context for CLI commands.
pub struct CliContext {
    pub settings: Settings,
    pub store: EntryStore,
    pub catalog: Arc<dyn CatalogPort>,
    /// Shares the catalog client's connection pool.
    pub fetcher: Fetcher,
}

impl CliContext {
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub const fn store(&self) -> &EntryStore {
        &self.store
    }

    /// Pipeline over this context's store and client.
    pub fn pipeline(&self, config: DownloadConfig) -> Result<DownloadPipeline, CliError> {
        Ok(DownloadPipeline::new(
            config,
            Arc::clone(&self.catalog),
            self.store.clone(),
            self.fetcher.clone(),
        )?)
    }
}

fn client_config(settings: &Settings) -> CatalogClientConfig {
    CatalogClientConfig::new()
        .with_base_url(settings.base_url.clone())
        .with_timeout(settings.api_timeout)
        .with_optional_api_key(settings.api_key.clone())
        .with_retry(settings.retry)
        .with_page_limit(settings.page_limit)
}

/// Bootstrap the CLI application.
///
/// 1. Opens the database at the resolved path, creating it if needed
/// 2. Builds the catalog client
/// 3. Returns the context handlers run against
pub async fn bootstrap(settings: Settings) -> Result<CliContext> {
    let pool = setup_database(&settings.database_path)
        .await
        .map_err(|e| CliError::Database(format!("{}: {e:#}", settings.database_path.display())))?;
    let kv: Arc<dyn KvStorePort> = Arc::new(SqliteKvStore::new(pool));

    bootstrap_with(settings, kv)
}

/// Bootstrap over an existing store (for testing).
pub fn bootstrap_with(settings: Settings, kv: Arc<dyn KvStorePort>) -> Result<CliContext> {
    let client = DefaultCatalogClient::new(&client_config(&settings))
        .map_err(|e| CliError::Config(format!("cannot build HTTP client: {e}")))?;
    let fetcher = client.fetcher().clone();

    if settings.api_key.is_none() {
        tracing::debug!("no API key configured; restricted models will fail");
    }

    Ok(CliContext {
        settings,
        store: EntryStore::new(kv),
        catalog: Arc::new(client),
        fetcher,
    })
}
