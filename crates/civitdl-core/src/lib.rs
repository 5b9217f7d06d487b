//! Core domain types and port definitions for civitdl.
//!
//! This crate holds the pure data model of the downloader (catalog
//! snapshots, candidates, jobs, persistent entries), the ports the
//! adapters implement (key/value store, catalog), path-pattern expansion
//! and the fully-resolved configuration records. No network or database
//! code lives here.

#![deny(unused_crate_dependencies)]

pub mod config;
pub mod domain;
pub mod download;
pub mod paths;
pub mod ports;
pub mod services;

// Re-export commonly used types for convenience
pub use config::{DownloadConfig, FilterOptions, RetryPolicy, SidecarOptions};
pub use domain::{
    CatalogImage, CatalogModel, Candidate, Creator, EntryStatus, FileHashes, FileMetadata,
    ImagesPage, Job, ModelFile, ModelVersion, ModelsPage, PageMetadata, PersistentEntry,
    ResolvedTarget, VersionModelRef, entry_key,
};
pub use download::{DownloadError, DownloadResult};
pub use paths::{PathData, PatternError, expand_pattern, relative_folder, slugify};
pub use ports::{
    CatalogError, CatalogPort, CoreError, ImageQuery, KvStorePort, ModelQuery, Period,
    RepositoryError, SortOrder,
};
pub use services::{EntryStore, StoredEntry};

#[cfg(any(test, feature = "test-utils"))]
pub use ports::MemoryKvStore;
