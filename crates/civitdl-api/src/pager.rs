//! Cursor pagination over the catalog and the single-target shortcuts.
//!
//! Pagers are pull-based: each `next_page` call performs at most one
//! request. A consumer that has seen enough simply stops calling, which is
//! how the user limit ends a traversal early.

use std::sync::Arc;
use std::time::Duration;

use civitdl_core::{
    CatalogError, CatalogImage, CatalogModel, CatalogPort, ImageQuery, ModelQuery, VersionModelRef,
};

/// Shared cursor bookkeeping.
#[derive(Debug)]
struct CursorState {
    max_pages: u32,
    api_delay: Duration,
    cursor: Option<String>,
    pages_fetched: u32,
    done: bool,
}

impl CursorState {
    const fn new(max_pages: u32, api_delay: Duration) -> Self {
        Self {
            max_pages,
            api_delay,
            cursor: None,
            pages_fetched: 0,
            done: false,
        }
    }

    /// Whether another request may be made; sleeps between pages.
    async fn before_fetch(&self) -> bool {
        if self.done {
            return false;
        }
        if self.pages_fetched > 0 && !self.api_delay.is_zero() {
            tokio::time::sleep(self.api_delay).await;
        }
        true
    }

    /// Record a fetched page; returns false when the page ends the traversal
    /// without yielding anything.
    fn after_fetch(&mut self, item_count: usize, next_cursor: Option<String>) -> bool {
        self.pages_fetched += 1;
        if item_count == 0 {
            tracing::debug!(target: "civitdl.api", page = self.pages_fetched, "empty page, stopping");
            self.done = true;
            return false;
        }
        if self.max_pages > 0 && self.pages_fetched >= self.max_pages {
            tracing::debug!(target: "civitdl.api", max_pages = self.max_pages, "page cap reached");
            self.done = true;
        }
        match next_cursor {
            Some(cursor) => self.cursor = Some(cursor),
            None => {
                tracing::debug!(target: "civitdl.api", page = self.pages_fetched, "no next cursor, last page");
                self.done = true;
            }
        }
        true
    }

    fn fail(&mut self) {
        self.done = true;
    }
}

// ============================================================================
// Models
// ============================================================================

/// Lazily pages through `GET /models`.
pub struct ModelPager<'a> {
    catalog: &'a dyn CatalogPort,
    query: ModelQuery,
    state: CursorState,
}

impl<'a> ModelPager<'a> {
    /// `max_pages == 0` means unbounded.
    pub fn new(
        catalog: &'a dyn CatalogPort,
        query: ModelQuery,
        max_pages: u32,
        api_delay: Duration,
    ) -> Self {
        Self {
            catalog,
            query,
            state: CursorState::new(max_pages, api_delay),
        }
    }

    pub const fn pages_fetched(&self) -> u32 {
        self.state.pages_fetched
    }

    /// Next page of models, or `None` once the traversal is over.
    ///
    /// After an error the pager is finished; items already returned remain
    /// valid.
    pub async fn next_page(&mut self) -> Result<Option<Vec<CatalogModel>>, CatalogError> {
        if !self.state.before_fetch().await {
            return Ok(None);
        }

        let page = match self
            .catalog
            .models_page(&self.query, self.state.cursor.as_deref())
            .await
        {
            Ok(page) => page,
            Err(e) => {
                self.state.fail();
                return Err(e);
            }
        };

        tracing::info!(
            target: "civitdl.api",
            page = self.state.pages_fetched + 1,
            items = page.items.len(),
            "fetched models page"
        );

        if self
            .state
            .after_fetch(page.items.len(), page.metadata.next_cursor)
        {
            Ok(Some(page.items))
        } else {
            Ok(None)
        }
    }
}

// ============================================================================
// Images
// ============================================================================

/// Lazily pages through `GET /images`.
pub struct ImagePager<'a> {
    catalog: &'a dyn CatalogPort,
    query: ImageQuery,
    state: CursorState,
}

impl<'a> ImagePager<'a> {
    pub fn new(
        catalog: &'a dyn CatalogPort,
        query: ImageQuery,
        max_pages: u32,
        api_delay: Duration,
    ) -> Self {
        Self {
            catalog,
            query,
            state: CursorState::new(max_pages, api_delay),
        }
    }

    pub async fn next_page(&mut self) -> Result<Option<Vec<CatalogImage>>, CatalogError> {
        if !self.state.before_fetch().await {
            return Ok(None);
        }

        let page = match self
            .catalog
            .images_page(&self.query, self.state.cursor.as_deref())
            .await
        {
            Ok(page) => page,
            Err(e) => {
                self.state.fail();
                return Err(e);
            }
        };

        if self
            .state
            .after_fetch(page.items.len(), page.metadata.next_cursor)
        {
            Ok(Some(page.items))
        } else {
            Ok(None)
        }
    }

    /// Drain every remaining page.
    pub async fn collect_all(mut self) -> Result<Vec<CatalogImage>, CatalogError> {
        let mut all = Vec::new();
        while let Some(items) = self.next_page().await? {
            all.extend(items);
        }
        Ok(all)
    }
}

// ============================================================================
// Single-target shortcuts
// ============================================================================

/// Model owning `version_id`, with only that version in `model_versions`.
///
/// The parent model is fetched for its creator and full snapshot; if that
/// lookup fails with a non-fatal error the model is rebuilt from the
/// summary embedded in the version.
pub async fn fetch_by_version_id(
    catalog: &dyn CatalogPort,
    version_id: u64,
) -> Result<Arc<CatalogModel>, CatalogError> {
    let version = catalog.model_version(version_id).await?;

    let mut model = match catalog.model(version.model_id).await {
        Ok(model) => model,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            tracing::warn!(
                target: "civitdl.api",
                model_id = version.model_id,
                error = %e,
                "parent model lookup failed, using version summary"
            );
            let summary: VersionModelRef = version.model.clone().unwrap_or_default();
            CatalogModel {
                id: version.model_id,
                name: summary.name,
                model_type: summary.model_type,
                nsfw: summary.nsfw,
                ..CatalogModel::default()
            }
        }
    };

    // The standalone version payload carries files and images; prefer it.
    model.model_versions = vec![version];
    Ok(Arc::new(model))
}

/// A model with either all of its versions or only the first one.
pub async fn fetch_by_model_id(
    catalog: &dyn CatalogPort,
    model_id: u64,
    all_versions: bool,
) -> Result<Arc<CatalogModel>, CatalogError> {
    let mut model = catalog.model(model_id).await?;
    if !all_versions {
        model.model_versions.truncate(1);
    }
    Ok(Arc::new(model))
}
