//! Store reconciliation: decides skip, enqueue or re-enqueue per candidate.
//!
//! Every emitted job has its pending entry written first, and each key is
//! emitted at most once per run so a worker is the only writer of its key.

use std::collections::HashSet;

use civitdl_core::{
    Candidate, EntryStatus, EntryStore, Job, PersistentEntry, RepositoryError, SidecarOptions,
};

use crate::filter::CandidateFilter;
use crate::resolver::PathResolver;

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// No usable entry existed; a pending one was written.
    Enqueued,
    /// An entry existed and was reset to pending.
    Requeued,
    /// Already downloaded; emitted only so sidecar images get reconciled.
    ImagesOnly,
    SkipDownloaded,
    SkipDuplicate,
    SkipLimit,
    SkipBaseModel,
    SkipUnresolvable(String),
    SkipStoreError(String),
}

impl Decision {
    pub const fn emitted(&self) -> bool {
        matches!(self, Self::Enqueued | Self::Requeued | Self::ImagesOnly)
    }
}

/// Accumulates jobs for one run.
pub struct Reconciler {
    store: EntryStore,
    resolver: PathResolver,
    filter: CandidateFilter,
    sidecars: SidecarOptions,
    user_limit: usize,
    emitted: HashSet<String>,
    jobs: Vec<Job>,
    total_bytes: u64,
}

impl Reconciler {
    /// `user_limit == 0` means unbounded.
    pub fn new(
        store: EntryStore,
        resolver: PathResolver,
        filter: CandidateFilter,
        sidecars: SidecarOptions,
        user_limit: usize,
    ) -> Self {
        Self {
            store,
            resolver,
            filter,
            sidecars,
            user_limit,
            emitted: HashSet::new(),
            jobs: Vec::new(),
            total_bytes: 0,
        }
    }

    /// Whether the user limit has been reached.
    pub fn is_full(&self) -> bool {
        self.user_limit > 0 && self.jobs.len() >= self.user_limit
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Declared bytes over all emitted jobs.
    pub const fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn into_jobs(self) -> (Vec<Job>, u64) {
        (self.jobs, self.total_bytes)
    }

    /// Reconcile one candidate with the store.
    pub async fn offer(&mut self, candidate: Candidate) -> Decision {
        if self.is_full() {
            return Decision::SkipLimit;
        }
        if let Err(reason) = self.filter.check_version(&candidate.version) {
            tracing::debug!(target: "civitdl.download", version_id = candidate.version_id(), %reason, "skipping");
            return Decision::SkipBaseModel;
        }

        let key = candidate.key();
        if self.emitted.contains(&key) {
            tracing::debug!(
                target: "civitdl.download",
                key = %key,
                file = %candidate.file.name,
                "version already queued this run"
            );
            return Decision::SkipDuplicate;
        }

        let target = match self.resolver.resolve(&candidate) {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!(target: "civitdl.download", key = %key, error = %e, "cannot resolve target path");
                return Decision::SkipUnresolvable(e.to_string());
            }
        };
        let filename = target
            .file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let decision = match self.store.get(&key).await {
            Ok(mut entry) if entry.same_content(&candidate) => match entry.status {
                EntryStatus::Downloaded if !self.sidecars.wants_images() => {
                    return Decision::SkipDownloaded;
                }
                EntryStatus::Downloaded => Decision::ImagesOnly,
                EntryStatus::Pending | EntryStatus::Error => {
                    if entry.folder != target.relative_dir {
                        tracing::info!(
                            target: "civitdl.download",
                            key = %key,
                            from = %entry.folder,
                            to = %target.relative_dir,
                            "folder drifted, correcting"
                        );
                    }
                    entry.reset_pending(&candidate, &target.relative_dir);
                    if let Err(e) = self.store.put(&key, &entry).await {
                        return store_failure(&key, &e);
                    }
                    Decision::Requeued
                }
            },
            Ok(_) => {
                tracing::info!(target: "civitdl.download", key = %key, "content identity changed, re-queueing");
                let entry = PersistentEntry::pending(&candidate, &target.relative_dir, filename);
                if let Err(e) = self.store.put(&key, &entry).await {
                    return store_failure(&key, &e);
                }
                Decision::Requeued
            }
            Err(e) if e.is_not_found() || matches!(e, RepositoryError::Serialization(_)) => {
                if !e.is_not_found() {
                    tracing::warn!(target: "civitdl.download", key = %key, error = %e, "unreadable entry, treating as new");
                }
                let entry = PersistentEntry::pending(&candidate, &target.relative_dir, filename);
                if let Err(e) = self.store.put(&key, &entry).await {
                    return store_failure(&key, &e);
                }
                Decision::Enqueued
            }
            Err(e) => return store_failure(&key, &e),
        };

        self.emitted.insert(key);
        let job = Job::new(candidate, target);
        self.total_bytes += job.size_bytes();
        self.jobs.push(job);
        decision
    }
}

fn store_failure(key: &str, error: &RepositoryError) -> Decision {
    tracing::error!(target: "civitdl.download", key, error = %error, "store access failed, skipping candidate");
    Decision::SkipStoreError(error.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use civitdl_core::{
        CatalogModel, FileHashes, FileMetadata, FilterOptions, KvStorePort, MemoryKvStore,
        ModelFile, ModelVersion,
    };

    fn candidate(version_id: u64, file_id: u64, crc: &str) -> Candidate {
        Candidate::new(
            Arc::new(CatalogModel {
                id: 10,
                name: "toon".into(),
                model_type: "CKPT".into(),
                ..Default::default()
            }),
            ModelVersion {
                id: version_id,
                model_id: 10,
                base_model: "SD1.5".into(),
                ..Default::default()
            },
            ModelFile {
                id: file_id,
                name: "toon.safetensors".into(),
                size_kb: 1024.0,
                metadata: FileMetadata {
                    format: Some("SafeTensor".into()),
                    ..Default::default()
                },
                hashes: FileHashes {
                    crc32: Some(crc.into()),
                    ..Default::default()
                },
                ..Default::default()
            },
        )
    }

    fn reconciler(kv: Arc<MemoryKvStore>, sidecars: SidecarOptions, limit: usize) -> Reconciler {
        Reconciler::new(
            EntryStore::new(kv),
            PathResolver::new("/d", "{modelType}/{modelName}/{baseModel}", "{modelType}"),
            CandidateFilter::new(FilterOptions {
                ignore_base_models: vec!["pony".into()],
                ..Default::default()
            }),
            sidecars,
            limit,
        )
    }

    #[tokio::test]
    async fn test_new_candidate_writes_pending_before_emitting() {
        let kv = Arc::new(MemoryKvStore::new());
        let mut rec = reconciler(kv.clone(), SidecarOptions::default(), 0);

        assert_eq!(rec.offer(candidate(100, 1, "AA")).await, Decision::Enqueued);

        let entry = EntryStore::new(kv).get("v_100").await.unwrap();
        assert_eq!(entry.status, EntryStatus::Pending);
        assert_eq!(entry.folder, "CKPT/toon/SD1.5");
        assert_eq!(entry.filename, "100_toon.safetensors");
        assert_eq!(rec.jobs().len(), 1);
        assert_eq!(rec.total_bytes(), 1024 * 1024);
    }

    #[tokio::test]
    async fn test_downloaded_is_skipped_unless_images_wanted() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = EntryStore::new(kv.clone());
        let mut entry = PersistentEntry::pending(&candidate(100, 1, "AA"), "CKPT/toon/SD1.5", "f");
        entry.mark_downloaded("CKPT/toon/SD1.5", "100_toon.safetensors");
        store.put("v_100", &entry).await.unwrap();

        let mut rec = reconciler(kv.clone(), SidecarOptions::default(), 0);
        assert_eq!(rec.offer(candidate(100, 1, "aa")).await, Decision::SkipDownloaded);
        assert!(rec.jobs().is_empty());

        let images = SidecarOptions {
            version_images: true,
            ..Default::default()
        };
        let mut rec = reconciler(kv, images, 0);
        assert_eq!(rec.offer(candidate(100, 1, "AA")).await, Decision::ImagesOnly);
        // Status untouched.
        assert_eq!(store.get("v_100").await.unwrap().status, EntryStatus::Downloaded);
    }

    #[tokio::test]
    async fn test_error_entry_is_reset_and_folder_fixed() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = EntryStore::new(kv.clone());
        let mut entry = PersistentEntry::pending(&candidate(100, 1, "AA"), "old/place", "f");
        entry.mark_error("boom");
        store.put("v_100", &entry).await.unwrap();

        let mut rec = reconciler(kv, SidecarOptions::default(), 0);
        assert_eq!(rec.offer(candidate(100, 1, "AA")).await, Decision::Requeued);

        let entry = store.get("v_100").await.unwrap();
        assert_eq!(entry.status, EntryStatus::Pending);
        assert!(entry.error_details.is_empty());
        assert_eq!(entry.folder, "CKPT/toon/SD1.5");
    }

    #[tokio::test]
    async fn test_changed_content_requeues_downloaded_entry() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = EntryStore::new(kv.clone());
        let mut entry = PersistentEntry::pending(&candidate(100, 1, "AA"), "CKPT/toon/SD1.5", "f");
        entry.mark_downloaded("CKPT/toon/SD1.5", "f");
        store.put("v_100", &entry).await.unwrap();

        let mut rec = reconciler(kv, SidecarOptions::default(), 0);
        assert_eq!(rec.offer(candidate(100, 1, "BB")).await, Decision::Requeued);
        let entry = store.get("v_100").await.unwrap();
        assert_eq!(entry.status, EntryStatus::Pending);
        assert_eq!(entry.file.hashes.crc32(), Some("BB"));
    }

    #[tokio::test]
    async fn test_corrupt_entry_treated_as_new() {
        let kv = Arc::new(MemoryKvStore::new());
        kv.put("v_100", b"{not json").await.unwrap();

        let mut rec = reconciler(kv.clone(), SidecarOptions::default(), 0);
        assert_eq!(rec.offer(candidate(100, 1, "AA")).await, Decision::Enqueued);
        assert!(EntryStore::new(kv).get("v_100").await.is_ok());
    }

    #[tokio::test]
    async fn test_limit_duplicates_and_base_model() {
        let kv = Arc::new(MemoryKvStore::new());
        let mut rec = reconciler(kv, SidecarOptions::default(), 2);

        assert!(rec.offer(candidate(100, 1, "AA")).await.emitted());
        assert_eq!(rec.offer(candidate(100, 2, "BB")).await, Decision::SkipDuplicate);

        let mut pony = candidate(101, 3, "CC");
        pony.version.base_model = "Pony".into();
        assert_eq!(rec.offer(pony).await, Decision::SkipBaseModel);

        assert!(rec.offer(candidate(102, 4, "DD")).await.emitted());
        assert!(rec.is_full());
        assert_eq!(rec.offer(candidate(103, 5, "EE")).await, Decision::SkipLimit);

        let (jobs, _) = rec.into_jobs();
        assert_eq!(jobs.len(), 2);
    }
}
