//! Command handlers.
//!
//! Handlers follow one pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`
//! - Thin wrappers that validate CLI input, call into the pipeline or the
//!   store, and format output for the terminal

pub mod clean;
pub mod delete;
pub mod download;
pub mod list;
pub mod redownload;
pub mod verify;
pub mod view;
