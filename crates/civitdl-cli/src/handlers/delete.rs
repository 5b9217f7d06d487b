//! `delete` / `db delete` handler.
//!
//! Removes the selected store entries and, unless `--keep-files`, the
//! installed file and its `.json` metadata sidecar.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Result;
use civitdl_core::{PersistentEntry, StoredEntry};
use civitdl_download::join_folder;

use crate::bootstrap::CliContext;
use crate::commands::DeleteArgs;
use crate::error::CliError;
use crate::presentation::{entry_row, print_entry_header};
use crate::utils::input;

/// Totals of a delete run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub entries: usize,
    pub files: usize,
    pub failed: usize,
}

fn selected(row: &StoredEntry, args: &DeleteArgs) -> bool {
    let by_version = args.version_ids.is_empty()
        || row.version_id().is_some_and(|id| args.version_ids.contains(&id));
    match &row.entry {
        Ok(entry) => {
            by_version
                && args.model_id.is_none_or(|id| entry.model_id == id)
                && args.status.is_none_or(|s| entry.status == s)
        }
        // Unreadable rows can only be picked by version id.
        Err(_) => {
            !args.version_ids.is_empty()
                && by_version
                && args.model_id.is_none()
                && args.status.is_none()
        }
    }
}

/// The installed file and its metadata sidecar.
pub fn entry_files(save_root: &Path, entry: &PersistentEntry) -> Vec<PathBuf> {
    if entry.filename.is_empty() {
        return Vec::new();
    }
    let file = join_folder(save_root, &entry.folder, &entry.filename);
    let sidecar = file.with_extension("json");
    if sidecar == file {
        vec![file]
    } else {
        vec![file, sidecar]
    }
}

pub async fn select(ctx: &CliContext, args: &DeleteArgs) -> Result<Vec<StoredEntry>> {
    Ok(ctx
        .store()
        .scan()
        .await?
        .into_iter()
        .filter(|row| selected(row, args))
        .collect())
}

/// Delete `rows`. An entry whose file cannot be removed is kept.
pub async fn remove(ctx: &CliContext, rows: &[StoredEntry], keep_files: bool) -> Result<DeleteReport> {
    let mut report = DeleteReport::default();

    'rows: for row in rows {
        if let (false, Ok(entry)) = (keep_files, &row.entry) {
            for path in entry_files(&ctx.settings().save_root, entry) {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => report.files += 1,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => {
                        tracing::error!(key = %row.key, path = %path.display(), error = %e, "cannot remove file");
                        eprintln!("✗ {}: cannot remove {}: {e}", row.key, path.display());
                        report.failed += 1;
                        continue 'rows;
                    }
                }
            }
        }

        ctx.store().delete(&row.key).await?;
        report.entries += 1;
    }
    Ok(report)
}

pub async fn execute(ctx: &CliContext, args: &DeleteArgs) -> Result<()> {
    if !args.has_selection() {
        return Err(CliError::Arguments(
            "nothing selected; use --version-id, --model-id or --status".to_string(),
        )
        .into());
    }

    let rows = select(ctx, args).await?;
    if rows.is_empty() {
        println!("No matching entries.");
        return Ok(());
    }

    print_entry_header();
    for row in &rows {
        println!("{}", entry_row(row));
    }
    println!();

    if args.dry_run {
        println!("Dry run: {} entr(ies) would be deleted.", rows.len());
        return Ok(());
    }

    let what = if args.keep_files {
        "entries (files are kept)"
    } else {
        "entries and their files"
    };
    if !input::confirm_unless(args.force, &format!("Delete {} {what}?", rows.len()))? {
        println!("Delete cancelled.");
        return Ok(());
    }

    let report = remove(ctx, &rows, args.keep_files).await?;
    println!(
        "Deleted {} entr(ies) and {} file(s).",
        report.entries, report.files
    );
    if report.failed > 0 {
        return Err(CliError::Core(format!("{} entr(ies) could not be deleted", report.failed)).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::{context, downloaded_entry};
    use civitdl_core::{EntryStatus, FileHashes};

    async fn seeded(root: &Path) -> CliContext {
        let ctx = context(root);
        for (vid, folder) in [(100, "m/a"), (101, "m/b"), (200, "n/c")] {
            let name = format!("{vid}_f.safetensors");
            let entry = downloaded_entry(vid, folder, &name, FileHashes::default());
            let dir = root.join(folder);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join(&name), b"w").unwrap();
            std::fs::write(dir.join(format!("{vid}_f.json")), b"{}").unwrap();
            ctx.store().put(&format!("v_{vid}"), &entry).await.unwrap();
        }
        ctx
    }

    #[tokio::test]
    async fn test_delete_by_model_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = seeded(dir.path()).await;

        // downloaded_entry puts versions 100 and 101 under model 10
        let args = DeleteArgs {
            model_id: Some(10),
            ..DeleteArgs::default()
        };
        let rows = select(&ctx, &args).await.unwrap();
        assert_eq!(rows.len(), 2);

        let report = remove(&ctx, &rows, false).await.unwrap();
        assert_eq!(
            report,
            DeleteReport {
                entries: 2,
                files: 4,
                failed: 0
            }
        );
        assert!(!dir.path().join("m/a/100_f.safetensors").exists());
        assert!(!dir.path().join("m/a/100_f.json").exists());
        assert!(dir.path().join("n/c/200_f.safetensors").exists());
        assert_eq!(ctx.store().scan().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_keep_files_only_touches_store() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = seeded(dir.path()).await;

        let args = DeleteArgs {
            version_ids: vec![200],
            keep_files: true,
            ..DeleteArgs::default()
        };
        let rows = select(&ctx, &args).await.unwrap();
        let report = remove(&ctx, &rows, true).await.unwrap();
        assert_eq!(report.entries, 1);
        assert_eq!(report.files, 0);
        assert!(dir.path().join("n/c/200_f.safetensors").exists());
        assert!(ctx.store().get("v_200").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_status_selection() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = seeded(dir.path()).await;
        ctx.store()
            .update("v_101", |e| e.mark_error("boom"))
            .await
            .unwrap();

        let args = DeleteArgs {
            status: Some(EntryStatus::Error),
            ..DeleteArgs::default()
        };
        let rows = select(&ctx, &args).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, "v_101");
    }
}
