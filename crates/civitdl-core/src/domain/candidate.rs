//! Candidates and jobs.

use std::path::PathBuf;
use std::sync::Arc;

use super::catalog::{CatalogImage, CatalogModel, ModelFile, ModelVersion};

/// Store key for a version.
pub fn entry_key(version_id: u64) -> String {
    format!("v_{version_id}")
}

/// A prospective download: one file of one version of one model.
///
/// The model snapshot is shared between all candidates produced from the
/// same catalog record.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub model: Arc<CatalogModel>,
    pub version: ModelVersion,
    pub file: ModelFile,
}

impl Candidate {
    pub fn new(model: Arc<CatalogModel>, version: ModelVersion, file: ModelFile) -> Self {
        Self {
            model,
            version,
            file,
        }
    }

    pub fn model_id(&self) -> u64 {
        self.model.id
    }

    pub const fn version_id(&self) -> u64 {
        self.version.id
    }

    pub const fn file_id(&self) -> u64 {
        self.file.id
    }

    pub fn key(&self) -> String {
        entry_key(self.version.id)
    }

    /// Declared CRC32 of the file.
    pub fn crc32(&self) -> Option<&str> {
        self.file.hashes.crc32()
    }

    /// Images attached to this version.
    pub fn version_images(&self) -> &[CatalogImage] {
        &self.version.images
    }
}

/// Where a candidate lands on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Directory relative to the save root, as stored in `folder`.
    pub relative_dir: String,
    /// Absolute directory the file is written into.
    pub absolute_dir: PathBuf,
    /// Intended final file path, before filename negotiation.
    pub file_path: PathBuf,
}

/// A candidate handed to a worker together with its store key.
#[derive(Debug, Clone)]
pub struct Job {
    pub candidate: Candidate,
    pub key: String,
    pub target: ResolvedTarget,
}

impl Job {
    pub fn new(candidate: Candidate, target: ResolvedTarget) -> Self {
        let key = candidate.key();
        Self {
            candidate,
            key,
            target,
        }
    }

    /// Declared size in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.candidate.file.size_bytes()
    }
}
