//! Table formatting utilities for CLI output.

use civitdl_core::{EntryStatus, StoredEntry};
use indicatif::HumanBytes;

/// Truncates a string to a maximum number of characters, adding "..." if
/// needed.
///
/// # Examples
///
/// ```rust
/// use civitdl_cli::presentation::truncate_string;
///
/// assert_eq!(truncate_string("Hello", 10), "Hello");
/// assert_eq!(truncate_string("Hello World", 8), "Hello...");
/// ```
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Print a horizontal separator line.
pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}

/// Byte count in human units, e.g. `1.50 GiB`.
pub fn format_size(bytes: u64) -> String {
    HumanBytes(bytes).to_string()
}

pub fn print_entry_header() {
    println!(
        "{:<10} {:<10} {:<28} {:<12} {:<10} File / Error",
        "Version", "Model", "Name", "Type", "Status"
    );
    print_separator(110);
}

/// One table row for a stored entry.
pub fn entry_row(row: &StoredEntry) -> String {
    let version = row
        .version_id()
        .map_or_else(|| row.key.clone(), |id| id.to_string());
    match &row.entry {
        Ok(entry) => {
            let detail = match entry.status {
                EntryStatus::Error => entry.error_details.as_str(),
                _ if entry.filename.is_empty() => entry.file.name.as_str(),
                _ => entry.filename.as_str(),
            };
            format!(
                "{:<10} {:<10} {:<28} {:<12} {:<10} {}",
                version,
                entry.model_id,
                truncate_string(&entry.model_name, 27),
                truncate_string(&entry.model_type, 11),
                entry.status,
                detail
            )
        }
        Err(e) => format!("{version:<10} {:<10} unreadable entry: {e}", "--"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string_counts_chars() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("ãããããããã", 5), "ãã...");
    }

    #[test]
    fn test_unreadable_row() {
        let row = StoredEntry {
            key: "v_7".to_string(),
            entry: Err("bad json".to_string()),
        };
        let line = entry_row(&row);
        assert!(line.starts_with('7'));
        assert!(line.contains("unreadable entry: bad json"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(1024), "1.00 KiB");
    }
}
