//! Domain types for the downloader.
//!
//! - `catalog` - snapshots of catalog records as returned by the HTTP API
//! - `candidate` - prospective downloads and the jobs handed to workers
//! - `entry` - the record persisted under `v_<versionId>`

mod candidate;
mod catalog;
mod entry;

pub use candidate::{Candidate, Job, ResolvedTarget, entry_key};
pub use catalog::{
    CatalogImage, CatalogModel, Creator, FileHashes, FileMetadata, ImagesPage, ModelFile,
    ModelVersion, ModelsPage, PageMetadata, VersionModelRef,
};
pub use entry::{EntryStatus, PersistentEntry};
