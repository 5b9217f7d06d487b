//! Catalog port: the remote model index.
//!
//! The HTTP implementation lives in `civitdl-api`.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{CatalogModel, ImagesPage, ModelVersion, ModelsPage};

/// Errors from catalog operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// Connection, DNS, TLS or read failure that survived all retries.
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Non-200 response that is not otherwise classified.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        status: u16,
        /// Response body sample, at most 200 characters.
        body: String,
    },

    /// 401 or 403.
    #[error("Unauthorized (HTTP {status}); check the API key")]
    Unauthorized { status: u16 },

    /// 429 on every attempt.
    #[error("Rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// Malformed response body.
    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    /// The requested record does not exist.
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// The request could not be built.
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

impl CatalogError {
    /// Whether this error must abort an entire traversal.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::RateLimited { .. })
    }
}

/// Sort order for the models endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    HighestRated,
    #[default]
    MostDownloaded,
    Newest,
}

impl SortOrder {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HighestRated => "Highest Rated",
            Self::MostDownloaded => "Most Downloaded",
            Self::Newest => "Newest",
        }
    }

    /// Parse a sort name, falling back to the default for anything unknown.
    pub fn parse_or_default(value: &str) -> Self {
        let normalized: String = value
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "highestrated" => Self::HighestRated,
            "mostdownloaded" => Self::MostDownloaded,
            "newest" => Self::Newest,
            _ => {
                tracing::warn!(target: "civitdl.api", sort = value, "unknown sort, using default");
                Self::default()
            }
        }
    }
}

/// Time window for the models and images endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Period {
    #[default]
    AllTime,
    Year,
    Month,
    Week,
    Day,
}

impl Period {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllTime => "AllTime",
            Self::Year => "Year",
            Self::Month => "Month",
            Self::Week => "Week",
            Self::Day => "Day",
        }
    }

    pub fn parse_or_default(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "alltime" | "all" => Self::AllTime,
            "year" => Self::Year,
            "month" => Self::Month,
            "week" => Self::Week,
            "day" => Self::Day,
            _ => {
                tracing::warn!(target: "civitdl.api", period = value, "unknown period, using default");
                Self::default()
            }
        }
    }
}

/// Query parameters for `GET /models`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelQuery {
    pub limit: Option<u32>,
    pub page: Option<u32>,
    pub query: Option<String>,
    pub tag: Option<String>,
    pub username: Option<String>,
    pub types: Vec<String>,
    pub base_models: Vec<String>,
    pub sort: SortOrder,
    pub period: Period,
    pub primary_file_only: bool,
    pub nsfw: Option<bool>,
    pub allow_no_credit: Option<bool>,
    pub allow_derivatives: Option<bool>,
    pub allow_different_license: Option<bool>,
    pub allow_commercial_use: Option<String>,
}

/// Query parameters for `GET /images`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageQuery {
    pub limit: Option<u32>,
    pub post_id: Option<u64>,
    pub model_id: Option<u64>,
    pub model_version_id: Option<u64>,
    pub username: Option<String>,
    pub sort: Option<String>,
    pub period: Option<Period>,
    pub nsfw: Option<String>,
}

impl ImageQuery {
    pub const MAX_LIMIT: u32 = 200;

    /// Images of one model.
    pub fn for_model(model_id: u64) -> Self {
        Self {
            model_id: Some(model_id),
            limit: Some(Self::MAX_LIMIT),
            ..Self::default()
        }
    }

    /// Limit clamped to the accepted `1..=200` range.
    pub fn clamped_limit(&self) -> Option<u32> {
        self.limit.map(|l| l.clamp(1, Self::MAX_LIMIT))
    }
}

/// Port trait for catalog lookups.
#[async_trait]
pub trait CatalogPort: Send + Sync {
    /// Fetch one page of models; `cursor` is `None` for the first page.
    async fn models_page(
        &self,
        query: &ModelQuery,
        cursor: Option<&str>,
    ) -> Result<ModelsPage, CatalogError>;

    /// Fetch a model with all of its versions.
    async fn model(&self, model_id: u64) -> Result<CatalogModel, CatalogError>;

    /// Fetch a single version.
    async fn model_version(&self, version_id: u64) -> Result<ModelVersion, CatalogError>;

    /// Fetch one page of images.
    async fn images_page(
        &self,
        query: &ImageQuery,
        cursor: Option<&str>,
    ) -> Result<ImagesPage, CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn _assert_object_safe(_: Arc<dyn CatalogPort>) {}

    #[test]
    fn sort_falls_back_to_most_downloaded() {
        assert_eq!(SortOrder::parse_or_default("Newest"), SortOrder::Newest);
        assert_eq!(
            SortOrder::parse_or_default("highest-rated"),
            SortOrder::HighestRated
        );
        assert_eq!(SortOrder::parse_or_default("weird"), SortOrder::MostDownloaded);
        assert_eq!(SortOrder::default().as_str(), "Most Downloaded");
    }

    #[test]
    fn period_falls_back_to_all_time() {
        assert_eq!(Period::parse_or_default("week"), Period::Week);
        assert_eq!(Period::parse_or_default("fortnight"), Period::AllTime);
    }

    #[test]
    fn image_limit_is_clamped() {
        let mut query = ImageQuery {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(query.clamped_limit(), Some(1));
        query.limit = Some(5000);
        assert_eq!(query.clamped_limit(), Some(200));
    }

    #[test]
    fn only_auth_and_rate_limit_are_fatal() {
        assert!(CatalogError::Unauthorized { status: 401 }.is_fatal());
        assert!(CatalogError::RateLimited { attempts: 4 }.is_fatal());
        assert!(
            !CatalogError::HttpStatus {
                status: 500,
                body: String::new()
            }
            .is_fatal()
        );
    }
}
