//! `SQLite` implementation of the `KvStorePort` trait.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use civitdl_core::{KvStorePort, RepositoryError};

/// `SQLite` implementation of the `KvStorePort` trait.
///
/// Each `put` is a single `INSERT OR REPLACE`, which `SQLite` applies
/// atomically.
#[derive(Clone)]
pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl SqliteKvStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn storage(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Storage(e.to_string())
}

#[async_trait]
impl KvStorePort for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, RepositoryError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        match row {
            Some(r) => Ok(r.get::<Vec<u8>, _>("value")),
            None => Err(RepositoryError::NotFound(key.to_string())),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), RepositoryError> {
        sqlx::query("INSERT OR REPLACE INTO kv_store (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        tracing::trace!(target: "civitdl.db", key, bytes = value.len(), "put");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        tracing::trace!(target: "civitdl.db", key, "delete");
        Ok(())
    }

    async fn fold(
        &self,
        visit: &mut (dyn for<'k> FnMut(&'k str, &'k [u8]) + Send),
    ) -> Result<(), RepositoryError> {
        let rows = sqlx::query("SELECT key, value FROM kv_store ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        for row in &rows {
            let key: String = row.get("key");
            let value: Vec<u8> = row.get("value");
            visit(&key, &value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = SqliteKvStore::new(setup_test_database().await.unwrap());
        let err = store.get("v_1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_put_replaces_value() {
        let store = SqliteKvStore::new(setup_test_database().await.unwrap());
        store.put("v_1", b"one").await.unwrap();
        store.put("v_1", b"two").await.unwrap();
        assert_eq!(store.get("v_1").await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_fold_visits_in_key_order() {
        let store = SqliteKvStore::new(setup_test_database().await.unwrap());
        for key in ["v_2", "v_1", "x_9"] {
            store.put(key, key.as_bytes()).await.unwrap();
        }
        let mut seen = Vec::new();
        store
            .fold(&mut |k: &str, v: &[u8]| seen.push((k.to_string(), v.to_vec())))
            .await
            .unwrap();
        let keys: Vec<&str> = seen.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["v_1", "v_2", "x_9"]);
        assert_eq!(seen[0].1, b"v_1");
    }
}
