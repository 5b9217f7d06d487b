//! Content sniffing and extension correction.

use std::path::{Path, PathBuf};

/// Bytes inspected when sniffing.
pub const SNIFF_LEN: usize = 512;

/// Media types that may rename a file, with their preferred extension.
///
/// Anything not in this table (octet-stream, text, model weights) keeps
/// the constructed extension.
fn sniff(head: &[u8]) -> Option<(&'static str, &'static str)> {
    if head.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(("image/png", "png"))
    } else if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(("image/jpeg", "jpg"))
    } else if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
        Some(("image/gif", "gif"))
    } else if head.len() >= 12 && &head[..4] == b"RIFF" && &head[8..12] == b"WEBP" {
        Some(("image/webp", "webp"))
    } else if head.len() >= 8 && &head[4..8] == b"ftyp" {
        Some(("video/mp4", "mp4"))
    } else if head.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        Some(("video/webm", "webm"))
    } else if head.starts_with(b"PK\x03\x04") {
        Some(("application/zip", "zip"))
    } else {
        None
    }
}

/// Whether `ext` is a known extension for `mime`.
fn extension_matches(mime: &str, ext: &str) -> bool {
    mime_guess::get_mime_extensions_str(mime)
        .is_some_and(|exts| exts.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Path with its extension corrected for the sniffed content, if needed.
pub fn corrected_path(path: &Path, head: &[u8]) -> Option<PathBuf> {
    let (mime, preferred) = sniff(head)?;
    let current = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    if extension_matches(mime, current) {
        return None;
    }
    tracing::debug!(
        target: "civitdl.download",
        path = %path.display(),
        detected = mime,
        "content type differs from extension"
    );
    Some(path.with_extension(preferred))
}
