//! In-memory record store for single-process use and tests.
//!
//! State is not persisted across restarts.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{validate_key, RecordStore, StoreResult};

#[derive(Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<BTreeMap<String, String>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn read(&self, key: &str) -> StoreResult<Option<String>> {
        validate_key(key)?;
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, contents: &str) -> StoreResult<()> {
        validate_key(key)?;
        self.records
            .write()
            .await
            .insert(key.to_string(), contents.to_string());
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        contents: &str,
    ) -> StoreResult<bool> {
        validate_key(key)?;
        let mut records = self.records.write().await;
        if records.get(key).map(String::as_str) != expected {
            return Ok(false);
        }
        records.insert(key.to_string(), contents.to_string());
        Ok(true)
    }

    async fn write_batch(&self, writes: &[(String, String)]) -> StoreResult<()> {
        for (key, _) in writes {
            validate_key(key)?;
        }
        let mut records = self.records.write().await;
        for (key, contents) in writes {
            records.insert(key.clone(), contents.clone());
        }
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .records
            .read()
            .await
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_compare_and_swap_requires_match() {
        let store = InMemoryStore::new();
        assert!(store.compare_and_swap("k", None, "a").await.unwrap());
        assert!(!store.compare_and_swap("k", Some("b"), "c").await.unwrap());
        assert_eq!(store.read("k").await.unwrap().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_keys_sorted_with_prefix() {
        let store = InMemoryStore::new();
        store.write("b_v1", "{}").await.unwrap();
        store.write("a_v2", "{}").await.unwrap();
        store.write("a_v1", "{}").await.unwrap();

        assert_eq!(store.keys("a_").await.unwrap(), vec!["a_v1", "a_v2"]);
        assert_eq!(store.len().await, 3);
    }
}
