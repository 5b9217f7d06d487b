//! Pipeline coordinator.
//!
//! Owns the long-lived pieces of a run (catalog handle, store, fetcher,
//! per-model image registry) and wires the stages together:
//! traversal → filter → reconciler → worker pool.

use std::sync::Arc;

use civitdl_api::{Fetcher, ModelPager, fetch_by_model_id, fetch_by_version_id};
use civitdl_core::{
    CatalogError, CatalogModel, CatalogPort, CoreError, DownloadConfig, DownloadError, EntryStore,
    Job, ModelQuery, RepositoryError,
};
use thiserror::Error;

use crate::filter::CandidateFilter;
use crate::manager::{DownloadManager, RunReport, WorkerDeps, join_folder};
use crate::progress::RunProgress;
use crate::reconciler::Reconciler;
use crate::resolver::PathResolver;
use crate::sidecars::{ModelImageRegistry, SidecarWriter, write_json_atomic};
use crate::summary::RunSummary;

/// Where candidates come from.
#[derive(Debug, Clone)]
pub enum CandidateSource {
    /// Paginated catalog search.
    Query(ModelQuery),
    /// One model; only its first version unless `all_versions`.
    ModelId { id: u64, all_versions: bool },
    /// One version.
    VersionId(u64),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Unauthorized or rate limited; the traversal was abandoned.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("catalog traversal stopped before any work was found: {0}")]
    NothingFound(CatalogError),

    #[error(transparent)]
    Config(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] RepositoryError),

    #[error("no stored entry for version {0}")]
    UnknownVersion(u64),

    #[error("version {0} has no downloadable file")]
    NoFile(u64),

    #[error(transparent)]
    Download(#[from] DownloadError),
}

/// Jobs produced by reconciliation, ready for the worker pool.
#[derive(Debug)]
pub struct Plan {
    pub jobs: Vec<Job>,
    /// Declared size of all jobs.
    pub total_bytes: u64,
    /// Non-fatal error that cut the traversal short.
    pub aborted: Option<CatalogError>,
}

/// Pages of models from any [`CandidateSource`].
struct ModelBatches<'a> {
    catalog: &'a dyn CatalogPort,
    pager: Option<ModelPager<'a>>,
    single: Option<CandidateSource>,
}

impl<'a> ModelBatches<'a> {
    fn new(catalog: &'a dyn CatalogPort, source: CandidateSource, config: &DownloadConfig) -> Self {
        match source {
            CandidateSource::Query(query) => Self {
                catalog,
                pager: Some(ModelPager::new(
                    catalog,
                    query,
                    config.max_pages,
                    config.api_delay,
                )),
                single: None,
            },
            single => Self {
                catalog,
                pager: None,
                single: Some(single),
            },
        }
    }

    async fn next_batch(&mut self) -> Result<Option<Vec<Arc<CatalogModel>>>, CatalogError> {
        if let Some(pager) = self.pager.as_mut() {
            return Ok(pager
                .next_page()
                .await?
                .map(|items| items.into_iter().map(Arc::new).collect()));
        }
        let model = match self.single.take() {
            None | Some(CandidateSource::Query(_)) => return Ok(None),
            Some(CandidateSource::ModelId { id, all_versions }) => {
                fetch_by_model_id(self.catalog, id, all_versions).await?
            }
            Some(CandidateSource::VersionId(id)) => fetch_by_version_id(self.catalog, id).await?,
        };
        Ok(Some(vec![model]))
    }
}

/// Long-lived coordinator for download runs.
pub struct DownloadPipeline {
    config: DownloadConfig,
    catalog: Arc<dyn CatalogPort>,
    store: EntryStore,
    fetcher: Fetcher,
    resolver: PathResolver,
    filter: CandidateFilter,
    registry: Arc<ModelImageRegistry>,
}

impl DownloadPipeline {
    pub fn new(
        config: DownloadConfig,
        catalog: Arc<dyn CatalogPort>,
        store: EntryStore,
        fetcher: Fetcher,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let resolver = PathResolver::new(
            config.save_root.clone(),
            config.version_path_pattern.clone(),
            config.model_info_path_pattern.clone(),
        );
        let filter = CandidateFilter::new(config.filter.clone());
        Ok(Self {
            config,
            catalog,
            store,
            fetcher,
            resolver,
            filter,
            registry: Arc::new(ModelImageRegistry::new()),
        })
    }

    pub const fn config(&self) -> &DownloadConfig {
        &self.config
    }

    pub const fn store(&self) -> &EntryStore {
        &self.store
    }

    /// Traverse the source and reconcile every candidate with the store.
    ///
    /// Unauthorized and rate-limit errors abort with `Err`. Any other
    /// traversal error keeps the jobs found so far, unless there are none.
    pub async fn plan(&self, source: CandidateSource) -> Result<Plan, PipelineError> {
        let mut reconciler = Reconciler::new(
            self.store.clone(),
            self.resolver.clone(),
            self.filter.clone(),
            self.config.sidecars,
            self.config.user_limit,
        );
        let mut batches = ModelBatches::new(self.catalog.as_ref(), source, &self.config);
        let mut aborted = None;

        'pages: loop {
            // Checked before each fetch so a full plan never requests a page.
            if reconciler.is_full() {
                tracing::info!(
                    target: "civitdl.download",
                    limit = self.config.user_limit,
                    "user limit reached"
                );
                break;
            }
            let models = match batches.next_batch().await {
                Ok(Some(models)) => models,
                Ok(None) => break,
                Err(e) if e.is_fatal() => return Err(PipelineError::Catalog(e)),
                Err(e) => {
                    tracing::warn!(target: "civitdl.download", error = %e, "catalog traversal stopped early");
                    aborted = Some(e);
                    break;
                }
            };

            for model in &models {
                for candidate in self.filter.candidates(model) {
                    if reconciler.is_full() {
                        continue 'pages;
                    }
                    let key = candidate.key();
                    let decision = reconciler.offer(candidate).await;
                    tracing::debug!(target: "civitdl.download", key = %key, ?decision, "reconciled");
                }
            }
        }

        let (jobs, total_bytes) = reconciler.into_jobs();
        if let Some(e) = aborted.as_ref() {
            if jobs.is_empty() {
                return Err(PipelineError::NothingFound(e.clone()));
            }
        }

        tracing::info!(target: "civitdl.download", jobs = jobs.len(), total_bytes, "plan ready");
        Ok(Plan {
            jobs,
            total_bytes,
            aborted,
        })
    }

    fn sidecar_writer(&self, summary: &Arc<RunSummary>) -> SidecarWriter {
        SidecarWriter::new(
            self.fetcher.clone(),
            Arc::clone(&self.catalog),
            self.resolver.clone(),
            self.config.sidecars,
            self.config.concurrency,
            self.config.api_delay,
            Arc::clone(&self.registry),
            Arc::clone(summary),
        )
    }

    /// Drain `jobs` through the worker pool.
    pub async fn run(&self, jobs: Vec<Job>, progress: RunProgress) -> RunReport {
        let summary = Arc::new(RunSummary::new());
        let deps = WorkerDeps {
            store: self.store.clone(),
            fetcher: self.fetcher.clone(),
            save_root: self.config.save_root.clone(),
            sidecars: self.sidecar_writer(&summary),
            progress,
            summary,
        };
        DownloadManager::new(deps, self.config.concurrency)
            .run(jobs)
            .await
    }

    /// Write sidecar JSONs for every candidate without touching the store
    /// or fetching files. Returns the number of files written.
    pub async fn write_metadata_only(&self, source: CandidateSource) -> Result<usize, PipelineError> {
        let mut batches = ModelBatches::new(self.catalog.as_ref(), source, &self.config);
        let mut written = 0usize;
        let mut visited = 0usize;

        let limit_reached = |visited: usize| self.config.user_limit > 0 && visited >= self.config.user_limit;

        'pages: loop {
            if limit_reached(visited) {
                break;
            }
            let models = match batches.next_batch().await {
                Ok(Some(models)) => models,
                Ok(None) => break,
                Err(e) if e.is_fatal() || visited == 0 => return Err(PipelineError::Catalog(e)),
                Err(e) => {
                    tracing::warn!(target: "civitdl.download", error = %e, "catalog traversal stopped early");
                    break;
                }
            };

            for model in &models {
                let mut model_info_done = false;
                for candidate in self.filter.candidates(model) {
                    if limit_reached(visited) {
                        continue 'pages;
                    }
                    visited += 1;

                    let target = match self.resolver.resolve(&candidate) {
                        Ok(target) => target,
                        Err(e) => {
                            tracing::warn!(target: "civitdl.download", key = %candidate.key(), error = %e, "cannot resolve target path");
                            continue;
                        }
                    };
                    let path = target.file_path.with_extension("json");
                    match write_json_atomic(&path, &candidate.version).await {
                        Ok(()) => written += 1,
                        Err(e) => tracing::warn!(target: "civitdl.download", path = %path.display(), error = %e, "version metadata failed"),
                    }

                    if self.config.sidecars.model_info && !model_info_done {
                        model_info_done = true;
                        let writer = self.sidecar_writer(&Arc::new(RunSummary::new()));
                        match writer.write_model_info(model).await {
                            Ok(_) => written += 1,
                            Err(e) => tracing::warn!(target: "civitdl.download", model_id = model.id, error = %e, "model info failed"),
                        }
                    }
                }
            }
        }

        tracing::info!(target: "civitdl.download", written, "metadata written");
        Ok(written)
    }

    /// Re-fetch one stored version regardless of its status.
    ///
    /// The previously installed file is removed first so the existence
    /// check cannot short-circuit the fetch.
    pub async fn redownload(
        &self,
        version_id: u64,
        progress: RunProgress,
    ) -> Result<RunReport, PipelineError> {
        let mut entry = match self.store.get_version(version_id).await {
            Ok(entry) => entry,
            Err(e) if e.is_not_found() => return Err(PipelineError::UnknownVersion(version_id)),
            Err(e) => return Err(e.into()),
        };

        let model = fetch_by_version_id(self.catalog.as_ref(), version_id).await?;
        let version = model
            .model_versions
            .first()
            .cloned()
            .ok_or(PipelineError::NoFile(version_id))?;
        let file = version
            .files
            .iter()
            .find(|f| f.id == entry.file.id)
            .cloned()
            .or_else(|| {
                self.filter
                    .candidates(&model)
                    .into_iter()
                    .next()
                    .map(|c| c.file)
            })
            .unwrap_or_else(|| entry.file.clone());
        if file.download_url.trim().is_empty() && version.download_url.is_none() {
            return Err(PipelineError::NoFile(version_id));
        }

        let candidate = civitdl_core::Candidate::new(Arc::clone(&model), version, file);
        let target = self
            .resolver
            .resolve(&candidate)
            .map_err(|e| DownloadError::path(e.to_string()))?;

        if !entry.filename.is_empty() {
            let existing = join_folder(&self.config.save_root, &entry.folder, &entry.filename);
            match tokio::fs::remove_file(&existing).await {
                Ok(()) => {
                    tracing::info!(target: "civitdl.download", path = %existing.display(), "removed previous file");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(DownloadError::from(e).into()),
            }
        }

        entry.reset_pending(&candidate, &target.relative_dir);
        self.store.put(&candidate.key(), &entry).await?;

        let report = self.run(vec![Job::new(candidate, target)], progress).await;
        Ok(report)
    }
}
