//! Command-line adapter for civitdl.
//!
//! Parses flags, merges them with the config file, initialises logging,
//! wires the store and catalog client together in [`bootstrap`] and hands
//! each command to its handler.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Silence unused dev-dependency warnings
#[cfg(test)]
use tempfile as _;

// Loaded by the binary before parsing
use dotenvy as _;

pub mod bootstrap;
pub mod commands;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod parser;
pub mod presentation;
pub mod utils;

// Re-export primary types for convenient access
pub use bootstrap::{CliContext, bootstrap};
pub use commands::{Commands, DbCommand, DeleteArgs, DownloadArgs};
pub use config::{FileConfig, Settings};
pub use error::CliError;
pub use logging::LogFormat;
pub use parser::Cli;
