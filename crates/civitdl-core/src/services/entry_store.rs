//! Entry store - typed access to persistent entries over the KV port.

use std::sync::Arc;

use crate::domain::{PersistentEntry, entry_key};
use crate::ports::{KvStorePort, RepositoryError};

const ENTRY_PREFIX: &str = "v_";

/// One decoded row from a full scan.
#[derive(Debug)]
pub struct StoredEntry {
    pub key: String,
    /// `Err` holds the decode error message for unreadable values.
    pub entry: Result<PersistentEntry, String>,
}

impl StoredEntry {
    /// Version id parsed from the key.
    pub fn version_id(&self) -> Option<u64> {
        self.key.strip_prefix(ENTRY_PREFIX)?.parse().ok()
    }
}

/// Service for reading and writing [`PersistentEntry`] records.
#[derive(Clone)]
pub struct EntryStore {
    kv: Arc<dyn KvStorePort>,
}

impl EntryStore {
    pub fn new(kv: Arc<dyn KvStorePort>) -> Self {
        Self { kv }
    }

    /// Load an entry.
    ///
    /// Missing keys yield `NotFound`, unreadable values `Serialization`.
    pub async fn get(&self, key: &str) -> Result<PersistentEntry, RepositoryError> {
        let bytes = self.kv.get(key).await?;
        PersistentEntry::from_bytes(&bytes)
    }

    pub async fn get_version(&self, version_id: u64) -> Result<PersistentEntry, RepositoryError> {
        self.get(&entry_key(version_id)).await
    }

    pub async fn put(&self, key: &str, entry: &PersistentEntry) -> Result<(), RepositoryError> {
        let bytes = entry.to_bytes()?;
        self.kv.put(key, &bytes).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        self.kv.delete(key).await
    }

    /// Get-modify-put.
    pub async fn update<F>(&self, key: &str, modify: F) -> Result<PersistentEntry, RepositoryError>
    where
        F: FnOnce(&mut PersistentEntry) + Send,
    {
        let mut entry = self.get(key).await?;
        modify(&mut entry);
        self.put(key, &entry).await?;
        Ok(entry)
    }

    /// Every `v_*` entry in key order.
    pub async fn scan(&self) -> Result<Vec<StoredEntry>, RepositoryError> {
        let mut rows: Vec<(String, Vec<u8>)> = Vec::new();
        self.kv
            .fold(&mut |key: &str, value: &[u8]| {
                if key.starts_with(ENTRY_PREFIX) {
                    rows.push((key.to_string(), value.to_vec()));
                }
            })
            .await?;

        Ok(rows
            .into_iter()
            .map(|(key, bytes)| StoredEntry {
                key,
                entry: PersistentEntry::from_bytes(&bytes).map_err(|e| e.to_string()),
            })
            .collect())
    }
}
