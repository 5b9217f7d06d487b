//! Seams between the core and its adapters.
//!
//! The store and the catalog are reached only through these traits, so the
//! download engine can run against SQLite and HTTP or against in-memory fakes.
//!
//! # Rules
//!
//! - No `sqlx` or `reqwest` types in any signature
//! - The store port is byte-oriented; typed access goes through `EntryStore`
//! - The catalog port speaks in catalog snapshots and `CatalogError`

pub mod catalog;
pub mod kv_store;

use thiserror::Error;

pub use catalog::{CatalogError, CatalogPort, ImageQuery, ModelQuery, Period, SortOrder};
pub use kv_store::KvStorePort;

#[cfg(any(test, feature = "test-utils"))]
pub use kv_store::MemoryKvStore;

/// Failure of a key/value store call.
///
/// Adapters flatten their driver errors into these three cases.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The requested key was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend rejected or failed the call.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A stored value is not a valid entry.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RepositoryError {
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors surfaced by core services.
///
/// Adapters map this to their own error types (CLI exit codes, log lines).
#[derive(Debug, Error)]
pub enum CoreError {
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Catalog operation failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Path pattern could not be expanded.
    #[error(transparent)]
    Pattern(#[from] crate::paths::PatternError),

    /// A resolved setting is out of range.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
