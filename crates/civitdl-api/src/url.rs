//! URL construction helpers for the catalog API.
//!
//! Pure functions; every endpoint URL the client requests is built here.

use civitdl_core::{ImageQuery, ModelQuery};
use url::Url;

use crate::error::ApiResult;

fn endpoint(base_url: &str, path: &str) -> ApiResult<Url> {
    let base = base_url.trim_end_matches('/');
    Ok(Url::parse(&format!("{base}/{path}"))?)
}

fn encode_pairs(pairs: &[(&str, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn with_query(mut url: Url, pairs: &[(&str, String)]) -> Url {
    if !pairs.is_empty() {
        url.set_query(Some(&encode_pairs(pairs)));
    }
    url
}

/// Query pairs for the models endpoint, in a stable order.
pub fn model_query_pairs(query: &ModelQuery, default_limit: u32) -> Vec<(&'static str, String)> {
    let mut pairs: Vec<(&'static str, String)> = Vec::new();

    let limit = query.limit.unwrap_or(default_limit);
    if limit > 0 {
        pairs.push(("limit", limit.to_string()));
    }
    if let Some(page) = query.page {
        pairs.push(("page", page.to_string()));
    }
    for (key, value) in [
        ("query", &query.query),
        ("tag", &query.tag),
        ("username", &query.username),
    ] {
        if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            pairs.push((key, v.to_string()));
        }
    }
    for t in query.types.iter().filter(|t| !t.is_empty()) {
        pairs.push(("types", t.clone()));
    }
    for b in query.base_models.iter().filter(|b| !b.is_empty()) {
        pairs.push(("baseModels", b.clone()));
    }
    pairs.push(("sort", query.sort.as_str().to_string()));
    pairs.push(("period", query.period.as_str().to_string()));
    if query.primary_file_only {
        pairs.push(("primaryFileOnly", "true".to_string()));
    }
    for (key, value) in [
        ("nsfw", query.nsfw),
        ("allowNoCredit", query.allow_no_credit),
        ("allowDerivatives", query.allow_derivatives),
        ("allowDifferentLicense", query.allow_different_license),
    ] {
        if let Some(v) = value {
            pairs.push((key, v.to_string()));
        }
    }
    if let Some(ref v) = query.allow_commercial_use {
        pairs.push(("allowCommercialUse", v.clone()));
    }

    pairs
}

/// `GET {base}/models?...`, with `cursor` on every page but the first.
pub fn build_models_url(
    base_url: &str,
    query: &ModelQuery,
    default_limit: u32,
    cursor: Option<&str>,
) -> ApiResult<Url> {
    let mut pairs = model_query_pairs(query, default_limit);
    if let Some(cursor) = cursor {
        pairs.push(("cursor", cursor.to_string()));
    }
    Ok(with_query(endpoint(base_url, "models")?, &pairs))
}

pub fn build_model_url(base_url: &str, model_id: u64) -> ApiResult<Url> {
    endpoint(base_url, &format!("models/{model_id}"))
}

pub fn build_version_url(base_url: &str, version_id: u64) -> ApiResult<Url> {
    endpoint(base_url, &format!("model-versions/{version_id}"))
}

/// `GET {base}/images?...`; `limit` is clamped to `1..=200`.
pub fn build_images_url(
    base_url: &str,
    query: &ImageQuery,
    cursor: Option<&str>,
) -> ApiResult<Url> {
    let mut pairs: Vec<(&str, String)> = Vec::new();
    if let Some(limit) = query.clamped_limit() {
        pairs.push(("limit", limit.to_string()));
    }
    for (key, value) in [
        ("postId", query.post_id),
        ("modelId", query.model_id),
        ("modelVersionId", query.model_version_id),
    ] {
        if let Some(v) = value {
            pairs.push((key, v.to_string()));
        }
    }
    if let Some(ref username) = query.username {
        pairs.push(("username", username.clone()));
    }
    if let Some(ref sort) = query.sort {
        pairs.push(("sort", sort.clone()));
    }
    if let Some(period) = query.period {
        pairs.push(("period", period.as_str().to_string()));
    }
    if let Some(ref nsfw) = query.nsfw {
        pairs.push(("nsfw", nsfw.clone()));
    }
    if let Some(cursor) = cursor {
        pairs.push(("cursor", cursor.to_string()));
    }
    Ok(with_query(endpoint(base_url, "images")?, &pairs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use civitdl_core::{Period, SortOrder};

    const BASE: &str = "https://civitai.com/api/v1";

    #[test]
    fn test_models_url_first_page() {
        let query = ModelQuery {
            query: Some("toon style".into()),
            types: vec!["Checkpoint".into(), "LORA".into()],
            sort: SortOrder::Newest,
            nsfw: Some(false),
            ..Default::default()
        };
        let url = build_models_url(BASE, &query, 100, None).unwrap();
        let s = url.as_str();

        assert!(s.starts_with("https://civitai.com/api/v1/models?"));
        assert!(s.contains("limit=100"));
        assert!(s.contains("query=toon%20style"));
        assert!(s.contains("types=Checkpoint&types=LORA"));
        assert!(s.contains("sort=Newest"));
        assert!(s.contains("period=AllTime"));
        assert!(s.contains("nsfw=false"));
        assert!(!s.contains("cursor="));
    }

    #[test]
    fn test_models_url_carries_cursor() {
        let url = build_models_url(BASE, &ModelQuery::default(), 100, Some("abc|1")).unwrap();
        assert!(url.as_str().contains("cursor=abc%7C1"));
        assert!(url.as_str().contains("sort=Most%20Downloaded"));
    }

    #[test]
    fn test_single_target_urls() {
        assert_eq!(
            build_model_url(BASE, 10).unwrap().as_str(),
            "https://civitai.com/api/v1/models/10"
        );
        assert_eq!(
            build_version_url("https://civitai.com/api/v1/", 100)
                .unwrap()
                .as_str(),
            "https://civitai.com/api/v1/model-versions/100"
        );
    }

    #[test]
    fn test_images_url_clamps_limit() {
        let query = ImageQuery {
            limit: Some(1000),
            model_id: Some(10),
            period: Some(Period::Week),
            ..Default::default()
        };
        let url = build_images_url(BASE, &query, Some("c2")).unwrap();
        let s = url.as_str();
        assert!(s.contains("limit=200"));
        assert!(s.contains("modelId=10"));
        assert!(s.contains("period=Week"));
        assert!(s.contains("cursor=c2"));
    }

    #[test]
    fn test_invalid_base_url_is_an_error() {
        assert!(build_model_url("not a url", 1).is_err());
    }
}
