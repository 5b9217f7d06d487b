//! Per-job download pipeline.
//!
//! The worker operates on a value-type [`Job`] and cloned [`WorkerDeps`];
//! it is the only writer of its job's store key for the whole run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use civitdl_api::Fetcher;
use civitdl_core::{
    DownloadError, EntryStatus, EntryStore, Job, PersistentEntry, relative_folder,
};

use crate::finalize::{FetchOutcome, FetchSpec, ensure_dir, fetch_to_path};
use crate::progress::RunProgress;
use crate::sidecars::SidecarWriter;
use crate::summary::RunSummary;

/// Dependencies for the download worker.
///
/// Cloned into every worker task; all handles are shared.
#[derive(Clone)]
pub struct WorkerDeps {
    pub store: EntryStore,
    pub fetcher: Fetcher,
    pub save_root: PathBuf,
    pub sidecars: SidecarWriter,
    pub progress: RunProgress,
    pub summary: Arc<RunSummary>,
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Downloaded(PathBuf),
    AlreadyPresent(PathBuf),
    Failed(DownloadError),
}

/// `save_root/folder/filename`, accepting absolute folders as stored.
pub fn join_folder(root: &Path, folder: &str, filename: &str) -> PathBuf {
    let dir = if Path::new(folder).is_absolute() {
        PathBuf::from(folder)
    } else {
        folder
            .split('/')
            .filter(|c| !c.is_empty())
            .fold(root.to_path_buf(), |acc, c| acc.join(c))
    };
    dir.join(filename)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Expected final path: the stored filename when already downloaded, so
/// earlier renames are honoured.
async fn expected_path(job: &Job, deps: &WorkerDeps) -> PathBuf {
    match deps.store.get(&job.key).await {
        Ok(entry) if entry.status == EntryStatus::Downloaded && !entry.filename.is_empty() => {
            join_folder(&deps.save_root, &entry.folder, &entry.filename)
        }
        Ok(_) => job.target.file_path.clone(),
        Err(e) => {
            tracing::warn!(target: "civitdl.download", key = %job.key, error = %e, "cannot re-read entry");
            job.target.file_path.clone()
        }
    }
}

async fn record_error(store: &EntryStore, job: &Job, error: &DownloadError) {
    let details = error.to_string();
    let result = store
        .update(&job.key, |entry| entry.mark_error(details.clone()))
        .await;
    let result = match result {
        Err(e) if e.is_not_found() => {
            let mut entry = PersistentEntry::pending(
                &job.candidate,
                &job.target.relative_dir,
                file_name(&job.target.file_path),
            );
            entry.mark_error(details);
            store.put(&job.key, &entry).await
        }
        other => other.map(|_| ()),
    };
    if let Err(e) = result {
        tracing::error!(target: "civitdl.download", key = %job.key, error = %e, "failed to record job error");
    }
}

fn download_url(job: &Job) -> Option<&str> {
    let file_url = job.candidate.file.download_url.trim();
    if !file_url.is_empty() {
        return Some(file_url);
    }
    job.candidate
        .version
        .download_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
}

async fn fetch_job(job: &Job, deps: &WorkerDeps) -> Result<FetchOutcome, DownloadError> {
    let target = expected_path(job, deps).await;
    let dir = target
        .parent()
        .ok_or_else(|| DownloadError::path(format!("{} has no parent directory", target.display())))?;
    ensure_dir(dir).await?;

    let url = download_url(job)
        .ok_or_else(|| DownloadError::other("file has no download URL"))?
        .to_string();

    let spec = FetchSpec {
        url,
        target_path: target,
        expected: job.candidate.file.hashes.clone(),
        version_id: job.candidate.version_id(),
        use_content_disposition: true,
    };
    fetch_to_path(&deps.fetcher, &spec, Some(&deps.progress)).await
}

/// Run one job to completion, recording its outcome in the store.
pub async fn run_job(job: Job, deps: &WorkerDeps) -> JobOutcome {
    deps.summary.job_attempted();
    tracing::debug!(target: "civitdl.download", key = %job.key, file = %job.candidate.file.name, "starting job");

    let outcome = match fetch_job(&job, deps).await {
        Ok(outcome) => outcome,
        Err(error) => {
            deps.summary.job_failed();
            record_error(&deps.store, &job, &error).await;
            tracing::error!(target: "civitdl.download", key = %job.key, error = %error, "download failed");
            deps.progress
                .println(format!("✗ {} {}: {error}", job.key, job.candidate.file.name));
            return JobOutcome::Failed(error);
        }
    };

    let final_path = outcome.path().to_path_buf();
    let folder = final_path
        .parent()
        .map(|dir| relative_folder(&deps.save_root, dir))
        .unwrap_or_default();
    let filename = file_name(&final_path);

    let candidate = &job.candidate;
    if let Err(e) = deps
        .store
        .update(&job.key, |entry| {
            entry.refresh_snapshots(candidate);
            entry.mark_downloaded(folder, filename);
        })
        .await
    {
        tracing::error!(
            target: "civitdl.download",
            key = %job.key,
            path = %final_path.display(),
            error = %e,
            "file is on disk but the store update failed"
        );
    }

    let result = match outcome {
        FetchOutcome::Downloaded { bytes, .. } => {
            deps.summary.job_downloaded();
            tracing::info!(target: "civitdl.download", key = %job.key, path = %final_path.display(), bytes, "downloaded");
            deps.progress
                .println(format!("✓ {} {}", job.key, final_path.display()));
            JobOutcome::Downloaded(final_path.clone())
        }
        FetchOutcome::AlreadyPresent(_) => {
            deps.summary.job_already_present();
            tracing::info!(target: "civitdl.download", key = %job.key, path = %final_path.display(), "already present");
            deps.progress
                .println(format!("= {} {}", job.key, final_path.display()));
            JobOutcome::AlreadyPresent(final_path.clone())
        }
    };

    if deps.sidecars.options().any() {
        deps.sidecars.write_all(candidate, &final_path).await;
    }

    result
}
