//! Catalog HTTP client for civitdl.
//!
//! - `http` - the retryable fetcher shared by catalog calls and downloads
//! - `url` - endpoint and query-string construction
//! - `pager` - cursor pagination and the single-target shortcuts
//! - `port` - the `CatalogPort` implementation

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]
// CatalogClient is used through the CatalogPort trait; its backend bound is internal
#![allow(private_interfaces)]

mod client;
mod config;
mod error;
mod http;
mod pager;
mod port;
mod url;

// ============================================================================
// Public API
// ============================================================================

// Client
pub use client::{CatalogClient, DefaultCatalogClient};

// Configuration
pub use config::CatalogClientConfig;

// Errors
pub use error::{ApiError, ApiResult};

// Fetcher
pub use http::Fetcher;

// Pagination
pub use pager::{ImagePager, ModelPager, fetch_by_model_id, fetch_by_version_id};

// Silence unused dev-dependency warnings
#[cfg(test)]
use mockito as _;
