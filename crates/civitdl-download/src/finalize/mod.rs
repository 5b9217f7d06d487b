//! Download finalizer: one URL to one verified file on disk.
//!
//! # Steps
//!
//! 1. Extension-tolerant existence check (with hash verification when
//!    hashes are declared)
//! 2. Stream the body into `<stem>.*.tmp` in the target directory
//! 3. Negotiate the final name from `Content-Disposition`
//! 4. Correct the extension from the first bytes of content
//! 5. Rename the temp file into place
//! 6. Verify declared hashes, deleting the file on mismatch
//!
//! The temp file is removed on every failure path.

mod disposition;
mod mime;

use std::path::{Path, PathBuf};

use civitdl_api::{ApiError, Fetcher};
use civitdl_core::{CatalogError, DownloadError, DownloadResult, FileHashes, slugify};
use reqwest::header::CONTENT_DISPOSITION;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::hashing::{HashCheck, verify_file};
use crate::progress::{ProgressThrottle, RunProgress};

use disposition::filename_from_disposition;
use mime::corrected_path;

#[cfg(unix)]
const DIR_MODE: u32 = 0o750;

/// One artifact to fetch.
#[derive(Debug, Clone)]
pub struct FetchSpec {
    pub url: String,
    /// Intended final path before name negotiation.
    pub target_path: PathBuf,
    /// Declared hashes; empty for images.
    pub expected: FileHashes,
    /// Prefix for negotiated names; 0 disables prefixing.
    pub version_id: u64,
    pub use_content_disposition: bool,
}

impl FetchSpec {
    /// Image fetch: no hashes, no prefix, constructed name kept.
    pub fn image(url: impl Into<String>, target_path: PathBuf) -> Self {
        Self {
            url: url.into(),
            target_path,
            expected: FileHashes::default(),
            version_id: 0,
            use_content_disposition: false,
        }
    }

    fn stem(&self) -> String {
        file_stem(&self.target_path)
    }
}

/// What [`fetch_to_path`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A matching file was already on disk.
    AlreadyPresent(PathBuf),
    Downloaded { path: PathBuf, bytes: u64 },
}

impl FetchOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::AlreadyPresent(path) | Self::Downloaded { path, .. } => path,
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn parent_dir(path: &Path) -> DownloadResult<&Path> {
    path.parent()
        .ok_or_else(|| DownloadError::path(format!("{} has no parent directory", path.display())))
}

pub(crate) fn api_error(err: ApiError) -> DownloadError {
    CatalogError::from(err).into()
}

/// Create `dir` and its parents with mode 0750.
pub async fn ensure_dir(dir: &Path) -> DownloadResult<()> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DIR_MODE);
    builder.create(dir).await.map_err(|e| {
        DownloadError::io(
            format!("{:?}", e.kind()),
            format!("cannot create {}: {e}", dir.display()),
        )
    })
}

/// A regular file in `dir` whose stem equals `stem`.
///
/// JSON sidecars and temp files never count.
pub async fn find_by_stem(dir: &Path, stem: &str) -> DownloadResult<Option<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if ext == "json" || ext == "tmp" {
            continue;
        }
        if file_stem(&path) == stem && entry.file_type().await?.is_file() {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

/// Final basename from the response headers.
fn negotiate_name(spec: &FetchSpec, response: &reqwest::Response) -> Option<String> {
    if !spec.use_content_disposition {
        return None;
    }
    let header = response.headers().get(CONTENT_DISPOSITION)?.to_str().ok()?;
    let name = slugify(&filename_from_disposition(header)?);
    if spec.version_id > 0 {
        let prefix = format!("{}_", spec.version_id);
        if !name.starts_with(&prefix) {
            return Some(format!("{prefix}{name}"));
        }
    }
    Some(name)
}

async fn read_head(path: &Path) -> DownloadResult<Vec<u8>> {
    let file = tokio::fs::File::open(path).await?;
    let mut head = Vec::with_capacity(mime::SNIFF_LEN);
    file.take(mime::SNIFF_LEN as u64)
        .read_to_end(&mut head)
        .await?;
    Ok(head)
}

/// Fetch `spec.url` into place.
///
/// Progress bytes are reported to `progress` in throttled batches.
pub async fn fetch_to_path(
    fetcher: &Fetcher,
    spec: &FetchSpec,
    progress: Option<&RunProgress>,
) -> DownloadResult<FetchOutcome> {
    let dir = parent_dir(&spec.target_path)?;
    ensure_dir(dir).await?;
    let stem = spec.stem();

    if let Some(existing) = find_by_stem(dir, &stem).await? {
        match verify_file(&existing, &spec.expected).await? {
            HashCheck::Match | HashCheck::NoHashes => {
                tracing::debug!(target: "civitdl.download", path = %existing.display(), "already present");
                return Ok(FetchOutcome::AlreadyPresent(existing));
            }
            HashCheck::Mismatch { algorithm, .. } => {
                tracing::warn!(
                    target: "civitdl.download",
                    path = %existing.display(),
                    algorithm,
                    "existing file does not match declared hash, downloading again"
                );
            }
        }
    }

    let mut response = fetcher.open(&spec.url).await.map_err(api_error)?;

    let temp = tempfile::Builder::new()
        .prefix(&format!("{stem}."))
        .suffix(".tmp")
        .tempfile_in(dir)?;
    // TempPath removes the file when dropped, covering every early return.
    let (std_file, temp_path) = temp.into_parts();
    let mut file = tokio::fs::File::from_std(std_file);

    let mut written: u64 = 0;
    let mut throttle = ProgressThrottle::default();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| DownloadError::network(format!("reading body of {}: {e}", spec.url)))?
    {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        if let (Some(progress), Some(batch)) = (progress, throttle.record(chunk.len() as u64)) {
            progress.add_bytes(batch);
        }
    }
    file.flush().await?;
    drop(file);
    if let Some(progress) = progress {
        progress.add_bytes(throttle.flush());
    }

    let mut final_path = negotiate_name(spec, &response)
        .map_or_else(|| spec.target_path.clone(), |name| dir.join(name));

    let head = read_head(&temp_path).await?;
    if let Some(fixed) = corrected_path(&final_path, &head) {
        tracing::info!(
            target: "civitdl.download",
            from = %final_path.display(),
            to = %fixed.display(),
            "correcting extension from content"
        );
        final_path = fixed;
    }

    temp_path
        .persist(&final_path)
        .map_err(|e| DownloadError::from_io_error(&e.error))?;

    if let HashCheck::Mismatch {
        algorithm,
        expected,
        actual,
    } = verify_file(&final_path, &spec.expected).await?
    {
        if let Err(e) = tokio::fs::remove_file(&final_path).await {
            tracing::warn!(target: "civitdl.download", path = %final_path.display(), error = %e, "failed to remove mismatched file");
        }
        return Err(DownloadError::hash_mismatch(algorithm, expected, actual));
    }

    Ok(FetchOutcome::Downloaded {
        path: final_path,
        bytes: written,
    })
}
