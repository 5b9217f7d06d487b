//! Download error types.
//!
//! The pipeline itself lives in `civitdl-download`; this module only holds
//! the serializable error shared by workers, the CLI and the store.

pub mod errors;

pub use errors::{DownloadError, DownloadResult};
