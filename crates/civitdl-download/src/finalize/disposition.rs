//! `Content-Disposition` filename extraction.

/// Filename carried by a `Content-Disposition` header value.
///
/// `filename*` (RFC 5987) wins over `filename`. Only the last path
/// component is returned.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for part in value.split(';').map(str::trim) {
        let Some((key, raw)) = part.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let raw = raw.trim().trim_matches('"');
                // charset'language'percent-encoded
                let encoded = raw.splitn(3, '\'').nth(2).unwrap_or(raw);
                extended = urlencoding::decode(encoded).ok().map(|s| s.into_owned());
            }
            "filename" => plain = Some(raw.trim().trim_matches('"').to_string()),
            _ => {}
        }
    }

    extended
        .or(plain)
        .and_then(|name| {
            name.rsplit(['/', '\\'])
                .next()
                .map(|s| s.trim().to_string())
        })
        .filter(|name| !name.is_empty())
}
