//! Download orchestration for civitdl.
//!
//! The pipeline, leaves first:
//!
//! - `filter` - file- and model-level predicates over catalog records
//! - `resolver` - pattern-driven on-disk targets
//! - `reconciler` - store lookups deciding skip / enqueue / re-enqueue
//! - `manager` - the worker pool and per-job finalizer
//! - `sidecars` - metadata JSONs and preview images
//! - `pipeline` - the coordinator tying the stages together

#![deny(unused_crate_dependencies)]

mod filter;
mod finalize;
mod hashing;
mod manager;
mod pipeline;
mod progress;
mod reconciler;
mod resolver;
mod sidecars;
mod summary;

// Re-export core types for convenience
pub use civitdl_core::{DownloadConfig, DownloadError, DownloadResult, Job};

pub use filter::{CandidateFilter, Rejection};
pub use finalize::{FetchOutcome, FetchSpec, ensure_dir, fetch_to_path, find_by_stem};
pub use hashing::{ComputedHashes, HashCheck, compute_hashes, verify_file};
pub use manager::{DownloadManager, JobOutcome, RunReport, WorkerDeps, join_folder, run_job};
pub use pipeline::{CandidateSource, DownloadPipeline, PipelineError, Plan};
pub use progress::{ProgressThrottle, RunProgress};
pub use reconciler::{Decision, Reconciler};
pub use resolver::PathResolver;
pub use sidecars::{ModelImageRegistry, SidecarWriter, write_json_atomic};
pub use summary::{RunSummary, SummarySnapshot};

// Silence unused dev-dependency warnings
#[cfg(test)]
use mockito as _;
