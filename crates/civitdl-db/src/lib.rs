//! SQLite-backed key/value store for civitdl.
//!
//! A single `kv_store` table holds every persistent entry as a JSON blob
//! keyed by `v_<versionId>`.

#![deny(unsafe_code)]

pub mod kv_store;
pub mod setup;

pub use kv_store::SqliteKvStore;

pub use setup::setup_database;
#[cfg(any(test, feature = "test-utils"))]
pub use setup::setup_test_database;
