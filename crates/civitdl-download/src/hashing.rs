//! Streaming hash computation for downloaded files.
//!
//! SHA256, BLAKE3 and CRC32 are computed in a single read of the file;
//! AutoV2 is the first 10 hex characters of the SHA256.

use std::io::Read;
use std::path::Path;

use blake3::Hasher as Blake3Hasher;
use civitdl_core::{DownloadError, DownloadResult, FileHashes};
use sha2::{Digest, Sha256};

/// Chunk size for reading files (8MB).
const CHUNK_SIZE: usize = 8 * 1024 * 1024;

const AUTO_V2_LEN: usize = 10;

/// Hashes of a file on disk. Hex values are uppercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedHashes {
    pub sha256: String,
    pub blake3: String,
    pub crc32: String,
}

impl ComputedHashes {
    pub fn auto_v2(&self) -> &str {
        &self.sha256[..AUTO_V2_LEN.min(self.sha256.len())]
    }
}

/// Outcome of comparing a file against declared hashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashCheck {
    /// Every declared hash matched.
    Match,
    /// Nothing to compare against.
    NoHashes,
    Mismatch {
        algorithm: &'static str,
        expected: String,
        actual: String,
    },
}

impl HashCheck {
    pub fn into_result(self) -> DownloadResult<()> {
        match self {
            Self::Match | Self::NoHashes => Ok(()),
            Self::Mismatch {
                algorithm,
                expected,
                actual,
            } => Err(DownloadError::hash_mismatch(algorithm, expected, actual)),
        }
    }
}

fn compute_blocking(path: &Path) -> std::io::Result<ComputedHashes> {
    let mut file = std::fs::File::open(path)?;

    let mut sha256_hasher = Sha256::new();
    let mut blake3_hasher = Blake3Hasher::new();
    let mut crc32_hasher = crc32fast::Hasher::new();

    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        let chunk = &buffer[..bytes_read];
        sha256_hasher.update(chunk);
        blake3_hasher.update(chunk);
        crc32_hasher.update(chunk);
    }

    Ok(ComputedHashes {
        sha256: hex::encode_upper(sha256_hasher.finalize()),
        blake3: blake3_hasher.finalize().to_hex().to_ascii_uppercase(),
        crc32: format!("{:08X}", crc32_hasher.finalize()),
    })
}

/// Hash a file on the blocking pool.
pub async fn compute_hashes(path: &Path) -> DownloadResult<ComputedHashes> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || compute_blocking(&path))
        .await
        .map_err(|e| DownloadError::other(format!("hash task failed: {e}")))?
        .map_err(DownloadError::from)
}

fn declared(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Compare computed hashes with the declared ones, case-insensitively.
///
/// Only hashes the catalog declared take part.
pub fn compare(expected: &FileHashes, actual: &ComputedHashes) -> HashCheck {
    let pairs: [(&'static str, Option<&str>, &str); 4] = [
        ("SHA256", declared(expected.sha256.as_ref()), &actual.sha256),
        ("BLAKE3", declared(expected.blake3.as_ref()), &actual.blake3),
        ("CRC32", declared(expected.crc32.as_ref()), &actual.crc32),
        ("AutoV2", declared(expected.auto_v2.as_ref()), actual.auto_v2()),
    ];

    let mut compared = false;
    for (algorithm, expected, actual) in pairs {
        let Some(expected) = expected else { continue };
        compared = true;
        if !expected.eq_ignore_ascii_case(actual) {
            return HashCheck::Mismatch {
                algorithm,
                expected: expected.to_string(),
                actual: actual.to_string(),
            };
        }
    }

    if compared { HashCheck::Match } else { HashCheck::NoHashes }
}

/// Hash `path` and compare it with `expected`.
///
/// Skips reading the file entirely when nothing is declared.
pub async fn verify_file(path: &Path, expected: &FileHashes) -> DownloadResult<HashCheck> {
    if !expected.has_standard() {
        return Ok(HashCheck::NoHashes);
    }
    let actual = compute_hashes(path).await?;
    Ok(compare(expected, &actual))
}
