//! Directory-backed record store: one pretty-printed JSON file per key.
//!
//! Writes go to a temp file in the same directory and are renamed into
//! place, so readers never observe a half-written record. Conditional and
//! multi-record writes are serialized through a per-store lock; that lock
//! is process-local, so two processes sharing a directory can still race.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

use super::{validate_key, RecordStore, StoreError, StoreResult};

const EXTENSION: &str = "json";

pub struct JsonDirStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonDirStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(format!("{}.{}", key, EXTENSION)))
    }

    fn read_path(&self, key: &str, path: &Path) -> StoreResult<Option<String>> {
        match std::fs::read(path) {
            // Invalid UTF-8 surfaces later as a parse failure (corrupt record).
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    /// Write `contents` to a temp file next to the target, ready to rename.
    fn stage(&self, key: &str, contents: &str) -> StoreResult<NamedTempFile> {
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };
        let mut staged = NamedTempFile::new_in(&self.root).map_err(io_err)?;
        staged.write_all(contents.as_bytes()).map_err(io_err)?;
        staged.as_file().sync_all().map_err(io_err)?;
        Ok(staged)
    }

    fn commit(&self, key: &str, staged: NamedTempFile, path: &Path) -> StoreResult<()> {
        staged.persist(path).map_err(|e| StoreError::Io {
            key: key.to_string(),
            source: e.error,
        })?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonDirStore {
    async fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key)?;
        self.read_path(key, &path)
    }

    async fn write(&self, key: &str, contents: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock().await;
        let staged = self.stage(key, contents)?;
        self.commit(key, staged, &path)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        contents: &str,
    ) -> StoreResult<bool> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock().await;

        let current = self.read_path(key, &path)?;
        if current.as_deref() != expected {
            return Ok(false);
        }

        let staged = self.stage(key, contents)?;
        self.commit(key, staged, &path)?;
        Ok(true)
    }

    async fn write_batch(&self, writes: &[(String, String)]) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;

        // Stage everything before renaming anything, so a failure while
        // writing leaves every target untouched.
        let mut staged = Vec::with_capacity(writes.len());
        for (key, contents) in writes {
            let path = self.path_for(key)?;
            staged.push((key.as_str(), self.stage(key, contents)?, path));
        }

        for (key, file, path) in staged {
            self.commit(key, file, &path)?;
        }
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let entries = std::fs::read_dir(&self.root).map_err(|source| StoreError::Io {
            key: prefix.to_string(),
            source,
        })?;

        let mut keys: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                    return None;
                }
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map(|s| s.to_string())
            })
            .filter(|key| key.starts_with(prefix) && !key.starts_with('.'))
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nested").join("batches");
        let store = JsonDirStore::open(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(store.root(), root.as_path());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();

        store.write("batch-1", "{\"a\":1}").await.unwrap();
        assert_eq!(
            store.read("batch-1").await.unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        assert!(dir.path().join("batch-1.json").exists());
        assert_eq!(store.read("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_compare_and_swap() {
        let dir = tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();

        assert!(store.compare_and_swap("k", None, "1").await.unwrap());
        assert!(!store.compare_and_swap("k", None, "2").await.unwrap());
        assert!(!store.compare_and_swap("k", Some("0"), "2").await.unwrap());
        assert!(store.compare_and_swap("k", Some("1"), "2").await.unwrap());
        assert_eq!(store.read("k").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_keys_filter_by_prefix_and_extension() {
        let dir = tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();

        store.write("doc1_v2", "{}").await.unwrap();
        store.write("doc1_v1", "{}").await.unwrap();
        store.write("doc2_v1", "{}").await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(
            store.keys("doc1_v").await.unwrap(),
            vec!["doc1_v1".to_string(), "doc1_v2".to_string()]
        );
        assert_eq!(store.keys("").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_write_batch_writes_all() {
        let dir = tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();

        store
            .write_batch(&[
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
            ])
            .await
            .unwrap();
        assert_eq!(store.read("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.read("b").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_write_batch_rejects_bad_key_before_writing() {
        let dir = tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();

        let result = store
            .write_batch(&[
                ("good".to_string(), "1".to_string()),
                ("../bad".to_string(), "2".to_string()),
            ])
            .await;
        assert!(matches!(result, Err(StoreError::InvalidKey(_))));
        assert_eq!(store.read("good").await.unwrap(), None);
    }
}
