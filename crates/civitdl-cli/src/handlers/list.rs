//! `db list` handler.

use anyhow::Result;
use civitdl_core::{EntryStatus, StoredEntry};

use crate::bootstrap::CliContext;
use crate::presentation::{entry_row, print_entry_header};

/// Whether a row passes the filters. Unreadable rows only show unfiltered.
pub fn matches(row: &StoredEntry, status: Option<EntryStatus>, model_id: Option<u64>) -> bool {
    match &row.entry {
        Ok(entry) => {
            status.is_none_or(|s| entry.status == s) && model_id.is_none_or(|id| entry.model_id == id)
        }
        Err(_) => status.is_none() && model_id.is_none(),
    }
}

pub async fn execute(
    ctx: &CliContext,
    status: Option<EntryStatus>,
    model_id: Option<u64>,
) -> Result<()> {
    let rows: Vec<StoredEntry> = ctx
        .store()
        .scan()
        .await?
        .into_iter()
        .filter(|row| matches(row, status, model_id))
        .collect();

    if rows.is_empty() {
        println!("No entries found.");
        return Ok(());
    }

    println!("Found {} entr{}:\n", rows.len(), if rows.len() == 1 { "y" } else { "ies" });
    print_entry_header();
    for row in &rows {
        println!("{}", entry_row(row));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::downloaded_entry;
    use civitdl_core::FileHashes;

    #[test]
    fn test_filters() {
        let row = StoredEntry {
            key: "v_100".to_string(),
            entry: Ok(downloaded_entry(100, "a", "100_a.safetensors", FileHashes::default())),
        };
        assert!(matches(&row, None, None));
        assert!(matches(&row, Some(EntryStatus::Downloaded), Some(10)));
        assert!(!matches(&row, Some(EntryStatus::Error), None));
        assert!(!matches(&row, None, Some(11)));

        let broken = StoredEntry {
            key: "v_1".to_string(),
            entry: Err("bad".to_string()),
        };
        assert!(matches(&broken, None, None));
        assert!(!matches(&broken, Some(EntryStatus::Pending), None));
    }
}
