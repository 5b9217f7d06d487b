//! Catalog record snapshots.
//!
//! These mirror the JSON shapes served by the catalog API. Only the fields
//! the downloader reasons about are typed; everything else is preserved in
//! the flattened `extra` map so that metadata sidecars and stored snapshots
//! carry the record as the server sent it.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Models
// ============================================================================

/// A model record with its embedded versions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogModel {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub model_type: String,
    #[serde(default)]
    pub nsfw: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<Creator>,
    #[serde(default)]
    pub model_versions: Vec<ModelVersion>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogModel {
    /// Creator username, if the catalog supplied one.
    pub fn creator_name(&self) -> Option<&str> {
        self.creator
            .as_ref()
            .and_then(|c| c.username.as_deref())
            .filter(|name| !name.is_empty())
    }
}

/// The account that published a model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

// ============================================================================
// Versions
// ============================================================================

/// Model summary embedded in a version fetched on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionModelRef {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub model_type: String,
    #[serde(default)]
    pub nsfw: bool,
}

/// A single version of a model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelVersion {
    pub id: u64,
    #[serde(default)]
    pub model_id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub base_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default)]
    pub files: Vec<ModelFile>,
    #[serde(default)]
    pub images: Vec<CatalogImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<VersionModelRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelVersion {
    /// Copy of this version without the inline file and image arrays.
    ///
    /// This is the snapshot stored in a persistent entry.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self {
            files: Vec::new(),
            images: Vec::new(),
            ..self.clone()
        }
    }
}

// ============================================================================
// Files
// ============================================================================

/// A downloadable file attached to a version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelFile {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "sizeKB")]
    pub size_kb: f64,
    #[serde(default, rename = "type")]
    pub file_type: String,
    #[serde(default, deserialize_with = "null_as_false")]
    pub primary: bool,
    #[serde(default)]
    pub metadata: FileMetadata,
    #[serde(default)]
    pub hashes: FileHashes,
    #[serde(default)]
    pub download_url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelFile {
    /// Declared size in bytes.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn size_bytes(&self) -> u64 {
        if self.size_kb.is_finite() && self.size_kb > 0.0 {
            (self.size_kb * 1024.0) as u64
        } else {
            0
        }
    }
}

/// Declared format attributes of a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Precision, e.g. `fp16`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fp: Option<String>,
    /// Size class, e.g. `pruned` or `full`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// File format, e.g. `SafeTensor`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Hashes the catalog declares for a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHashes {
    #[serde(default, rename = "SHA256", skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, rename = "BLAKE3", skip_serializing_if = "Option::is_none")]
    pub blake3: Option<String>,
    #[serde(default, rename = "CRC32", skip_serializing_if = "Option::is_none")]
    pub crc32: Option<String>,
    #[serde(default, rename = "AutoV2", skip_serializing_if = "Option::is_none")]
    pub auto_v2: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FileHashes {
    /// Whether any hash usable for content verification is present.
    pub fn has_standard(&self) -> bool {
        [&self.sha256, &self.blake3, &self.crc32, &self.auto_v2]
            .iter()
            .any(|h| h.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }

    /// Declared CRC32, ignoring blank values.
    pub fn crc32(&self) -> Option<&str> {
        self.crc32.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

// ============================================================================
// Images
// ============================================================================

/// A preview image record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogImage {
    /// Stable local name for the image.
    ///
    /// Uses the catalog id when present, otherwise the stem of the last
    /// URL path segment.
    pub fn local_id(&self) -> Option<String> {
        if let Some(id) = self.id {
            return Some(id.to_string());
        }
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        let segment = path.rsplit('/').find(|s| !s.is_empty())?;
        let stem = segment.rsplit_once('.').map_or(segment, |(stem, _)| stem);
        (!stem.is_empty()).then(|| stem.to_string())
    }

    /// Extension suggested by the URL (with leading dot), if any.
    pub fn url_extension(&self) -> Option<String> {
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        let segment = path.rsplit('/').next()?;
        let (_, ext) = segment.rsplit_once('.')?;
        let ok = !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric());
        ok.then(|| format!(".{}", ext.to_ascii_lowercase()))
    }
}

// ============================================================================
// Pages
// ============================================================================

/// One page of the cursor-paginated models endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelsPage {
    #[serde(default)]
    pub items: Vec<CatalogModel>,
    #[serde(default)]
    pub metadata: PageMetadata,
}

/// One page of the cursor-paginated images endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagesPage {
    #[serde(default)]
    pub items: Vec<CatalogImage>,
    #[serde(default)]
    pub metadata: PageMetadata,
}

/// Pagination metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    /// Cursor for the next page; the server sends either a string or a number.
    #[serde(default, deserialize_with = "cursor_string", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn cursor_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}
