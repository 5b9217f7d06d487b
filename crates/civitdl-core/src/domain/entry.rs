//! The persistent record of one version's download.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::candidate::Candidate;
use super::catalog::{ModelFile, ModelVersion};
use crate::ports::RepositoryError;

/// Lifecycle state of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryStatus {
    Pending,
    Downloaded,
    Error,
}

impl EntryStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Downloaded => "Downloaded",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "downloaded" => Ok(Self::Downloaded),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "unknown status '{other}' (expected pending, downloaded or error)"
            )),
        }
    }
}

/// Record stored under `v_<versionId>`.
///
/// `folder` is relative to the save root. `error_details` is non-empty
/// exactly when `status` is [`EntryStatus::Error`]; the mutators below keep
/// that true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentEntry {
    pub model_id: u64,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub model_type: String,
    #[serde(default)]
    pub creator: String,
    pub version: ModelVersion,
    pub file: ModelFile,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub folder: String,
    pub status: EntryStatus,
    #[serde(default)]
    pub error_details: String,
    pub created_at: DateTime<Utc>,
}

impl PersistentEntry {
    /// New pending entry for a candidate.
    pub fn pending(candidate: &Candidate, folder: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            model_id: candidate.model.id,
            model_name: candidate.model.name.clone(),
            model_type: candidate.model.model_type.clone(),
            creator: candidate.model.creator_name().unwrap_or_default().to_string(),
            version: candidate.version.trimmed(),
            file: candidate.file.clone(),
            filename: filename.into(),
            folder: folder.into(),
            status: EntryStatus::Pending,
            error_details: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Back to pending with fresh snapshots from `candidate`.
    pub fn reset_pending(&mut self, candidate: &Candidate, folder: &str) {
        if self.folder != folder {
            self.folder = folder.to_string();
        }
        self.status = EntryStatus::Pending;
        self.error_details.clear();
        self.refresh_snapshots(candidate);
    }

    pub fn refresh_snapshots(&mut self, candidate: &Candidate) {
        self.version = candidate.version.trimmed();
        self.file = candidate.file.clone();
        self.model_name.clone_from(&candidate.model.name);
        self.model_type.clone_from(&candidate.model.model_type);
        if let Some(creator) = candidate.model.creator_name() {
            self.creator = creator.to_string();
        }
    }

    pub fn mark_downloaded(&mut self, folder: impl Into<String>, filename: impl Into<String>) {
        self.status = EntryStatus::Downloaded;
        self.error_details.clear();
        self.folder = folder.into();
        self.filename = filename.into();
    }

    pub fn mark_error(&mut self, details: impl Into<String>) {
        let details = details.into();
        self.status = EntryStatus::Error;
        self.error_details = if details.trim().is_empty() {
            "unknown error".to_string()
        } else {
            details
        };
    }

    /// Whether the stored content identity matches a candidate.
    pub fn same_content(&self, candidate: &Candidate) -> bool {
        self.file.id == candidate.file.id
            && self.file.hashes.crc32().map(str::to_ascii_uppercase)
                == candidate.crc32().map(str::to_ascii_uppercase)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RepositoryError> {
        serde_json::to_vec(self).map_err(|e| RepositoryError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RepositoryError> {
        serde_json::from_slice(bytes).map_err(|e| RepositoryError::Serialization(e.to_string()))
    }
}
