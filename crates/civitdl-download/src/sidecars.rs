//! Sidecar artifacts: metadata JSONs and preview images.
//!
//! Failures here are logged and counted; they never change an entry's
//! status.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use civitdl_api::{Fetcher, ImagePager};
use civitdl_core::{
    Candidate, CatalogImage, CatalogModel, CatalogPort, DownloadError, DownloadResult, ImageQuery,
    SidecarOptions,
};
use futures_util::StreamExt;
use serde::Serialize;

use crate::finalize::{FetchOutcome, FetchSpec, ensure_dir, fetch_to_path};
use crate::resolver::PathResolver;
use crate::summary::RunSummary;

const IMAGES_DIR: &str = "images";

/// Image pages fetched when a model embeds no images.
const FALLBACK_IMAGE_PAGES: u32 = 1;

/// Serialize `value` as pretty JSON and move it into place atomically.
pub async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> DownloadResult<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| DownloadError::other(format!("serializing {}: {e}", path.display())))?;
    let dir = path
        .parent()
        .ok_or_else(|| DownloadError::path(format!("{} has no parent directory", path.display())))?
        .to_path_buf();
    ensure_dir(&dir).await?;

    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        use std::io::Write;

        let mut temp = tempfile::Builder::new().suffix(".tmp").tempfile_in(&dir)?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| DownloadError::other(format!("write task failed: {e}")))?
    .map_err(DownloadError::from)
}

/// Models whose images were already handled in this process.
#[derive(Debug, Default)]
pub struct ModelImageRegistry {
    seen: Mutex<HashSet<u64>>,
}

impl ModelImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time a model id is claimed.
    pub fn claim(&self, model_id: u64) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(model_id)
    }
}

/// Produces the sidecars enabled in [`SidecarOptions`].
#[derive(Clone)]
pub struct SidecarWriter {
    fetcher: Fetcher,
    catalog: Arc<dyn CatalogPort>,
    resolver: PathResolver,
    options: SidecarOptions,
    concurrency: usize,
    api_delay: Duration,
    registry: Arc<ModelImageRegistry>,
    summary: Arc<RunSummary>,
}

impl SidecarWriter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        fetcher: Fetcher,
        catalog: Arc<dyn CatalogPort>,
        resolver: PathResolver,
        options: SidecarOptions,
        concurrency: usize,
        api_delay: Duration,
        registry: Arc<ModelImageRegistry>,
        summary: Arc<RunSummary>,
    ) -> Self {
        Self {
            fetcher,
            catalog,
            resolver,
            options,
            concurrency: concurrency.max(1),
            api_delay,
            registry,
            summary,
        }
    }

    pub const fn options(&self) -> SidecarOptions {
        self.options
    }

    /// Every enabled sidecar for a finished job.
    pub async fn write_all(&self, candidate: &Candidate, final_path: &Path) {
        if self.options.metadata {
            if let Err(e) = self.write_version_metadata(candidate, final_path).await {
                tracing::warn!(target: "civitdl.download", key = %candidate.key(), error = %e, "version metadata failed");
            }
        }
        if self.options.model_info {
            if let Err(e) = self.write_model_info(&candidate.model).await {
                tracing::warn!(target: "civitdl.download", model_id = candidate.model_id(), error = %e, "model info failed");
            }
        }
        if self.options.version_images {
            self.save_version_images(candidate, final_path).await;
        }
        if self.options.model_images {
            self.save_model_images(&candidate.model, final_path).await;
        }
    }

    /// `<final path without extension>.json` with the full version.
    pub async fn write_version_metadata(
        &self,
        candidate: &Candidate,
        final_path: &Path,
    ) -> DownloadResult<PathBuf> {
        let path = final_path.with_extension("json");
        write_json_atomic(&path, &candidate.version).await?;
        tracing::debug!(target: "civitdl.download", path = %path.display(), "wrote version metadata");
        Ok(path)
    }

    /// Model-info JSON at the model-info pattern location.
    pub async fn write_model_info(&self, model: &CatalogModel) -> DownloadResult<PathBuf> {
        let path = self
            .resolver
            .model_info_path(model)
            .map_err(|e| DownloadError::path(e.to_string()))?;
        write_json_atomic(&path, model).await?;
        tracing::debug!(target: "civitdl.download", path = %path.display(), "wrote model info");
        Ok(path)
    }

    /// Images of the candidate's version, next to the file.
    pub async fn save_version_images(&self, candidate: &Candidate, final_path: &Path) {
        let Some(dir) = final_path.parent() else {
            return;
        };
        self.save_images(candidate.version_images(), &dir.join(IMAGES_DIR))
            .await;
    }

    /// Images of every version of the model, one level above the file.
    /// Runs at most once per model per process.
    pub async fn save_model_images(&self, model: &CatalogModel, final_path: &Path) {
        let Some(dir) = final_path.parent().and_then(Path::parent) else {
            return;
        };
        if !self.registry.claim(model.id) {
            return;
        }

        let mut images: Vec<CatalogImage> = model
            .model_versions
            .iter()
            .flat_map(|v| v.images.iter().cloned())
            .collect();

        if images.is_empty() {
            let pager = ImagePager::new(
                self.catalog.as_ref(),
                ImageQuery::for_model(model.id),
                FALLBACK_IMAGE_PAGES,
                self.api_delay,
            );
            match pager.collect_all().await {
                Ok(found) => images = found,
                Err(e) => {
                    tracing::warn!(target: "civitdl.download", model_id = model.id, error = %e, "image listing failed");
                    return;
                }
            }
        }

        self.save_images(&images, &dir.join(IMAGES_DIR)).await;
    }

    async fn save_images(&self, images: &[CatalogImage], dir: &Path) {
        let mut seen = HashSet::new();
        let specs: Vec<FetchSpec> = images
            .iter()
            .filter(|image| !image.url.is_empty())
            .filter_map(|image| {
                let id = image.local_id()?;
                seen.insert(id.clone()).then(|| {
                    let name = format!("{id}{}", image.url_extension().unwrap_or_default());
                    FetchSpec::image(image.url.clone(), dir.join(name))
                })
            })
            .collect();

        futures_util::stream::iter(specs)
            .map(|spec| async move {
                let result = fetch_to_path(&self.fetcher, &spec, None).await;
                (spec, result)
            })
            .buffer_unordered(self.concurrency)
            .for_each(|(spec, result)| async move {
                match result {
                    Ok(FetchOutcome::Downloaded { .. }) => self.summary.image_downloaded(),
                    Ok(FetchOutcome::AlreadyPresent(_)) => self.summary.image_skipped(),
                    Err(e) => {
                        self.summary.image_failed();
                        tracing::warn!(target: "civitdl.download", url = %spec.url, error = %e, "image download failed");
                    }
                }
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_claims_once() {
        let registry = ModelImageRegistry::new();
        assert!(registry.claim(10));
        assert!(!registry.claim(10));
        assert!(registry.claim(11));
    }

    #[tokio::test]
    async fn test_write_json_atomic_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("100_toon.json");
        write_json_atomic(&path, &serde_json::json!({"id": 100}))
            .await
            .unwrap();

        let back: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(back["id"], 100);
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
