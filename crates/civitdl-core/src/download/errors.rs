//! Download error types.
//!
//! These errors are serializable and do not hold `std::io::Error` or HTTP
//! client errors directly. For I/O errors, we capture the kind and message
//! as strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ports::{CatalogError, RepositoryError};

/// Error type for a single download job.
///
/// The `Display` output is what ends up in an entry's `errorDetails`.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum DownloadError {
    /// I/O error during file operations.
    #[error("I/O error ({kind}): {message}")]
    Io {
        /// The kind of I/O error (e.g., "`NotFound`", "`PermissionDenied`").
        kind: String,
        message: String,
    },

    /// Network/HTTP error during download.
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },

    /// The server rejected our credentials.
    #[error("Unauthorized (HTTP {status_code})")]
    Unauthorized { status_code: u16 },

    /// Post-download verification failed.
    #[error("downloaded file hash mismatch")]
    HashMismatch {
        /// Which hash disagreed (e.g. `SHA256`).
        algorithm: String,
        expected: String,
        actual: String,
    },

    /// Key/value store failure.
    #[error("Store error: {message}")]
    Store { message: String },

    /// Path pattern or relativization failure.
    #[error("Path error: {message}")]
    Path { message: String },

    /// General/uncategorized error.
    #[error("{message}")]
    Other { message: String },
}

impl DownloadError {
    pub fn io(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error from a `std::io::Error`.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        let kind = err.kind();
        Self::Io {
            kind: format!("{kind:?}"),
            message: err.to_string(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            status_code: None,
        }
    }

    pub fn network_with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self::Network {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    pub fn hash_mismatch(
        algorithm: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::HashMismatch {
            algorithm: algorithm.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn path(message: impl Into<String>) -> Self {
        Self::Path {
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Whether this error should abort the whole run rather than one job.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io_error(&err)
    }
}

impl From<RepositoryError> for DownloadError {
    fn from(err: RepositoryError) -> Self {
        Self::store(err.to_string())
    }
}

impl From<CatalogError> for DownloadError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Unauthorized { status } => Self::Unauthorized {
                status_code: status,
            },
            CatalogError::HttpStatus { status, body } => {
                Self::network_with_status(format!("HTTP {status}: {body}"), status)
            }
            CatalogError::RateLimited { .. } => {
                Self::network_with_status("rate limited", 429)
            }
            other => Self::network(other.to_string()),
        }
    }
}

/// Convenience result type for download operations.
pub type DownloadResult<T> = Result<T, DownloadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = DownloadError::from_io_error(&io_err);

        match err {
            DownloadError::Io { kind, message } => {
                assert_eq!(kind, "NotFound");
                assert!(message.contains("file not found"));
            }
            _ => panic!("Expected Io variant"),
        }
    }

    #[test]
    fn test_error_serialization() {
        let err = DownloadError::network_with_status("bad gateway", 502);
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("502"));

        let parsed: DownloadError = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, err);
    }

    #[test]
    fn test_hash_mismatch_message() {
        let err = DownloadError::hash_mismatch("SHA256", "AA", "BB");
        assert_eq!(err.to_string(), "downloaded file hash mismatch");
        assert!(matches!(err, DownloadError::HashMismatch { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_catalog_error_mapping() {
        let err: DownloadError = CatalogError::Unauthorized { status: 401 }.into();
        assert!(err.is_fatal());

        let err: DownloadError = CatalogError::HttpStatus {
            status: 404,
            body: "nope".into(),
        }
        .into();
        assert!(matches!(
            err,
            DownloadError::Network {
                status_code: Some(404),
                ..
            }
        ));
    }
}
