//! Run counters shared by all workers.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RunSummary {
    attempted: AtomicU64,
    downloaded: AtomicU64,
    already_present: AtomicU64,
    failed: AtomicU64,
    images_downloaded: AtomicU64,
    images_skipped: AtomicU64,
    images_failed: AtomicU64,
}

/// Point-in-time copy of [`RunSummary`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummarySnapshot {
    pub attempted: u64,
    pub downloaded: u64,
    pub already_present: u64,
    pub failed: u64,
    pub images_downloaded: u64,
    pub images_skipped: u64,
    pub images_failed: u64,
}

impl SummarySnapshot {
    pub const fn succeeded(&self) -> u64 {
        self.downloaded + self.already_present
    }

    /// Every attempted job failed.
    pub const fn all_failed(&self) -> bool {
        self.attempted > 0 && self.failed == self.attempted
    }
}

impl std::fmt::Display for SummarySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} attempted, {} downloaded, {} already present, {} failed",
            self.attempted, self.downloaded, self.already_present, self.failed
        )?;
        if self.images_downloaded + self.images_skipped + self.images_failed > 0 {
            write!(
                f,
                "; images: {} downloaded, {} skipped, {} failed",
                self.images_downloaded, self.images_skipped, self.images_failed
            )?;
        }
        Ok(())
    }
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_attempted(&self) {
        self.attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn job_downloaded(&self) {
        self.downloaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn job_already_present(&self) {
        self.already_present.fetch_add(1, Ordering::Relaxed);
    }

    pub fn job_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn image_downloaded(&self) {
        self.images_downloaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn image_skipped(&self) {
        self.images_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn image_failed(&self) {
        self.images_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SummarySnapshot {
        SummarySnapshot {
            attempted: self.attempted.load(Ordering::Relaxed),
            downloaded: self.downloaded.load(Ordering::Relaxed),
            already_present: self.already_present.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            images_downloaded: self.images_downloaded.load(Ordering::Relaxed),
            images_skipped: self.images_skipped.load(Ordering::Relaxed),
            images_failed: self.images_failed.load(Ordering::Relaxed),
        }
    }
}
