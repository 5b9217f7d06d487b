//! `clean` handler: removes `*.tmp` files left by interrupted runs.

use std::path::{Path, PathBuf};

use anyhow::Result;
use walkdir::WalkDir;

use crate::bootstrap::CliContext;

const TEMP_SUFFIX: &str = ".tmp";

/// Every temp file under `root`. A missing root yields nothing.
pub fn find_temp_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable path");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(TEMP_SUFFIX))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

pub async fn execute(ctx: &CliContext, dry_run: bool) -> Result<()> {
    let root = ctx.settings().save_root.clone();
    let files = tokio::task::spawn_blocking(move || find_temp_files(&root)).await?;

    if files.is_empty() {
        println!("No temporary files found.");
        return Ok(());
    }

    let mut removed = 0usize;
    for path in &files {
        if dry_run {
            println!("would remove {}", path.display());
            continue;
        }
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                removed += 1;
                tracing::debug!(path = %path.display(), "removed temp file");
            }
            Err(e) => eprintln!("✗ cannot remove {}: {e}", path.display()),
        }
    }

    if dry_run {
        println!("Dry run: {} temporary file(s) found.", files.len());
    } else {
        println!("Removed {removed} of {} temporary file(s).", files.len());
    }
    Ok(())
}
