//! `db verify` handler.
//!
//! Checks every `Downloaded` entry against the file it points at. Missing
//! files, and with `--check-hash` content that no longer matches the
//! catalog hashes, move the entry to `Error`.

use std::path::PathBuf;

use anyhow::Result;
use civitdl_core::{EntryStatus, EntryStore};
use civitdl_download::{join_folder, verify_file};

use crate::bootstrap::CliContext;
use crate::utils::input;

pub const MISSING_FILE: &str = "file missing on disk";

/// An entry that should move to `Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub key: String,
    pub path: PathBuf,
    pub details: String,
}

/// Downloaded entries checked and the problems found.
#[derive(Debug, Default)]
pub struct VerifyReport {
    pub checked: usize,
    pub findings: Vec<Finding>,
}

pub async fn inspect(ctx: &CliContext, check_hash: bool) -> Result<VerifyReport> {
    let save_root = &ctx.settings().save_root;
    let mut report = VerifyReport::default();

    for row in ctx.store().scan().await? {
        let entry = match row.entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %row.key, error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if entry.status != EntryStatus::Downloaded {
            continue;
        }
        report.checked += 1;

        let path = join_folder(save_root, &entry.folder, &entry.filename);
        let present = !entry.filename.is_empty()
            && tokio::fs::try_exists(&path).await.unwrap_or(false);
        let details = if !present {
            Some(MISSING_FILE.to_string())
        } else if check_hash {
            match verify_file(&path, &entry.file.hashes).await {
                Ok(check) => check.into_result().err().map(|e| e.to_string()),
                Err(e) => Some(e.to_string()),
            }
        } else {
            None
        };

        if let Some(details) = details {
            report.findings.push(Finding {
                key: row.key,
                path,
                details,
            });
        }
    }
    Ok(report)
}

/// Mark every finding as `Error`. Returns how many entries changed.
pub async fn apply(store: &EntryStore, findings: &[Finding]) -> Result<usize> {
    let mut updated = 0;
    for finding in findings {
        store
            .update(&finding.key, |entry| entry.mark_error(finding.details.clone()))
            .await?;
        updated += 1;
    }
    Ok(updated)
}

pub async fn execute(ctx: &CliContext, check_hash: bool, yes: bool) -> Result<()> {
    let report = inspect(ctx, check_hash).await?;

    if report.findings.is_empty() {
        println!("All {} downloaded entries verified.", report.checked);
        return Ok(());
    }

    println!(
        "{} of {} downloaded entries have problems:",
        report.findings.len(),
        report.checked
    );
    for finding in &report.findings {
        println!("  ✗ {} {}: {}", finding.key, finding.path.display(), finding.details);
    }

    if !input::confirm_unless(yes, "Mark these entries as Error?")? {
        println!("No changes made.");
        return Ok(());
    }

    let updated = apply(ctx.store(), &report.findings).await?;
    println!("Marked {updated} entries as Error.");
    Ok(())
}
