//! Key/value store port.

use async_trait::async_trait;

use super::RepositoryError;

/// Byte-oriented key/value store.
///
/// Keys are ASCII, values are UTF-8 JSON. Every write is a single-key
/// atomic operation; no multi-key transactions are offered.
#[async_trait]
pub trait KvStorePort: Send + Sync {
    /// Fetch the value stored under `key`.
    ///
    /// Returns [`RepositoryError::NotFound`] when the key is absent.
    async fn get(&self, key: &str) -> Result<Vec<u8>, RepositoryError>;

    /// Insert or replace the value under `key`.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), RepositoryError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), RepositoryError>;

    /// Visit every pair in key order.
    async fn fold(
        &self,
        visit: &mut (dyn for<'k> FnMut(&'k str, &'k [u8]) + Send),
    ) -> Result<(), RepositoryError>;
}

#[cfg(any(test, feature = "test-utils"))]
mod memory {
    use std::collections::BTreeMap;

    use async_trait::async_trait;
    use tokio::sync::RwLock;

    use super::{KvStorePort, RepositoryError};

    /// In-memory store used by tests across the workspace.
    #[derive(Debug, Default)]
    pub struct MemoryKvStore {
        inner: RwLock<BTreeMap<String, Vec<u8>>>,
    }

    impl MemoryKvStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn len(&self) -> usize {
            self.inner.read().await.len()
        }

        pub async fn is_empty(&self) -> bool {
            self.inner.read().await.is_empty()
        }
    }

    #[async_trait]
    impl KvStorePort for MemoryKvStore {
        async fn get(&self, key: &str) -> Result<Vec<u8>, RepositoryError> {
            self.inner
                .read()
                .await
                .get(key)
                .cloned()
                .ok_or_else(|| RepositoryError::NotFound(key.to_string()))
        }

        async fn put(&self, key: &str, value: &[u8]) -> Result<(), RepositoryError> {
            self.inner
                .write()
                .await
                .insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
            self.inner.write().await.remove(key);
            Ok(())
        }

        async fn fold(
            &self,
            visit: &mut (dyn for<'k> FnMut(&'k str, &'k [u8]) + Send),
        ) -> Result<(), RepositoryError> {
            for (key, value) in self.inner.read().await.iter() {
                visit(key, value);
            }
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryKvStore;
