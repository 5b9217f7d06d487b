//! Worker pool.
//!
//! # Concurrency Model
//!
//! - One producer fills a buffered channel sized to the job count, then
//!   closes it
//! - `concurrency` workers share the receiver and exit when it drains
//! - No ordering between workers; each job owns a unique store key and a
//!   unique target path

mod worker;

use std::sync::Arc;

use civitdl_core::{DownloadError, Job};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;

use crate::summary::SummarySnapshot;

pub use worker::{JobOutcome, WorkerDeps, join_folder, run_job};

/// Result of draining a job list.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: SummarySnapshot,
    /// First error that should abort the run (e.g. rejected credentials).
    pub fatal: Option<DownloadError>,
}

/// Fixed-size pool of download workers.
pub struct DownloadManager {
    deps: WorkerDeps,
    concurrency: usize,
}

impl DownloadManager {
    pub fn new(deps: WorkerDeps, concurrency: usize) -> Self {
        Self {
            deps,
            concurrency: concurrency.max(1),
        }
    }

    /// Run every job and wait for all workers to finish.
    pub async fn run(&self, jobs: Vec<Job>) -> RunReport {
        let (tx, rx) = mpsc::channel::<Job>(jobs.len().max(1));
        let workers = self.concurrency.min(jobs.len()).max(1);

        for job in jobs {
            // Capacity equals the job count, so this never waits.
            if tx.send(job).await.is_err() {
                break;
            }
        }
        drop(tx);

        let rx = Arc::new(Mutex::new(rx));
        let mut set = JoinSet::new();
        for worker_id in 0..workers {
            let rx = Arc::clone(&rx);
            let deps = self.deps.clone();
            set.spawn(async move {
                let mut fatal = None;
                loop {
                    let next = rx.lock().await.recv().await;
                    let Some(job) = next else {
                        break;
                    };
                    if let JobOutcome::Failed(error) = run_job(job, &deps).await {
                        if error.is_fatal() && fatal.is_none() {
                            fatal = Some(error);
                        }
                    }
                }
                tracing::debug!(target: "civitdl.download", worker_id, "worker finished");
                fatal
            });
        }

        let mut fatal = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Some(error)) if fatal.is_none() => fatal = Some(error),
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(target: "civitdl.download", error = %e, "worker task panicked");
                }
            }
        }

        self.deps.progress.finish();
        RunReport {
            summary: self.deps.summary.snapshot(),
            fatal,
        }
    }
}
