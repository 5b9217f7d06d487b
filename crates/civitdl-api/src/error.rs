//! Internal error types for catalog operations.
//!
//! These errors are mapped to the core `CatalogError` at the port boundary.

use civitdl_core::CatalogError;
use thiserror::Error;

/// Maximum characters of a response body kept on an error.
pub(crate) const BODY_SAMPLE_CHARS: usize = 200;

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors from the fetcher and client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Terminal non-200 response.
    #[error("request to {url} failed with status {status}: {body}")]
    Status {
        status: u16,
        url: String,
        /// Truncated response body
        body: String,
    },

    /// 401 or 403.
    #[error("request to {url} was rejected with status {status}")]
    Unauthorized { status: u16, url: String },

    /// 429 on every attempt.
    #[error("rate limited by {url} after {attempts} attempts")]
    RateLimited { attempts: u32, url: String },

    /// Network or HTTP client error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },
}

impl ApiError {
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::Unauthorized { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }
}

impl From<ApiError> for CatalogError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status: 404, url, .. } => Self::NotFound { what: url },
            ApiError::Status { status, body, .. } => Self::HttpStatus { status, body },
            ApiError::Unauthorized { status, .. } => Self::Unauthorized { status },
            ApiError::RateLimited { attempts, .. } => Self::RateLimited { attempts },
            ApiError::Network(e) if e.is_decode() => Self::Decode {
                message: e.to_string(),
            },
            ApiError::Network(e) => Self::Transport {
                message: e.to_string(),
            },
            ApiError::InvalidUrl(e) => Self::InvalidRequest {
                message: e.to_string(),
            },
            ApiError::JsonParse(e) => Self::Decode {
                message: e.to_string(),
            },
            ApiError::InvalidResponse { message } => Self::Decode { message },
        }
    }
}

/// First [`BODY_SAMPLE_CHARS`] characters of `body`.
pub(crate) fn body_sample(body: &str) -> String {
    body.chars().take(BODY_SAMPLE_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message() {
        let error = ApiError::Status {
            status: 400,
            url: "https://civitai.com/api/v1/models".to_string(),
            body: "bad".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("400"));
        assert!(msg.contains("civitai.com"));
    }

    #[test]
    fn test_body_sample_truncates_on_chars() {
        let long = "é".repeat(500);
        let sample = body_sample(&long);
        assert_eq!(sample.chars().count(), 200);
    }

    #[test]
    fn test_mapping_to_catalog_error() {
        let mapped: CatalogError = ApiError::Unauthorized {
            status: 403,
            url: String::new(),
        }
        .into();
        assert_eq!(mapped, CatalogError::Unauthorized { status: 403 });

        let mapped: CatalogError = ApiError::Status {
            status: 404,
            url: "u".into(),
            body: String::new(),
        }
        .into();
        assert!(matches!(mapped, CatalogError::NotFound { .. }));

        let mapped: CatalogError = ApiError::RateLimited {
            attempts: 4,
            url: String::new(),
        }
        .into();
        assert!(mapped.is_fatal());
    }
}
