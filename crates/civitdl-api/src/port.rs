//! `CatalogPort` implementation for `CatalogClient`.

use async_trait::async_trait;
use civitdl_core::{
    CatalogError, CatalogModel, CatalogPort, ImageQuery, ImagesPage, ModelQuery, ModelVersion,
    ModelsPage,
};

use crate::client::CatalogClient;
use crate::http::HttpBackend;
use crate::url::{build_images_url, build_model_url, build_models_url, build_version_url};

#[async_trait]
impl<B: HttpBackend> CatalogPort for CatalogClient<B> {
    async fn models_page(
        &self,
        query: &ModelQuery,
        cursor: Option<&str>,
    ) -> Result<ModelsPage, CatalogError> {
        let url = build_models_url(&self.base_url, query, self.page_limit, cursor)?;
        Ok(self.backend.get_json(&url).await?)
    }

    async fn model(&self, model_id: u64) -> Result<CatalogModel, CatalogError> {
        let url = build_model_url(&self.base_url, model_id)?;
        self.backend.get_json(&url).await.map_err(|e| {
            match CatalogError::from(e) {
                CatalogError::NotFound { .. } => CatalogError::NotFound {
                    what: format!("model {model_id}"),
                },
                other => other,
            }
        })
    }

    async fn model_version(&self, version_id: u64) -> Result<ModelVersion, CatalogError> {
        let url = build_version_url(&self.base_url, version_id)?;
        self.backend.get_json(&url).await.map_err(|e| {
            match CatalogError::from(e) {
                CatalogError::NotFound { .. } => CatalogError::NotFound {
                    what: format!("model version {version_id}"),
                },
                other => other,
            }
        })
    }

    async fn images_page(
        &self,
        query: &ImageQuery,
        cursor: Option<&str>,
    ) -> Result<ImagesPage, CatalogError> {
        let url = build_images_url(&self.base_url, query, cursor)?;
        Ok(self.backend.get_json(&url).await?)
    }
}
