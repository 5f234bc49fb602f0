//! Record storage for documents, batches, and versions.
//!
//! Every persisted record is a JSON document addressed by a string key.
//! The [`RecordStore`] trait is the raw key-value seam; [`Collection`] layers
//! typed (de)serialization on top and turns unparseable records into an
//! explicit [`Loaded::Corrupt`] outcome instead of an error, so listing and
//! aggregation can skip them and keep going.
//!
//! Backends:
//! - [`JsonDirStore`]: one `{key}.json` file per record in a directory.
//! - [`InMemoryStore`]: process-local map, used by tests.

mod json_dir;
mod memory;

pub use json_dir::JsonDirStore;
pub use memory::InMemoryStore;

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ClausewiseError, Result};

/// Result type for raw store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors from record store backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid record key: {0:?}")]
    InvalidKey(String),
    #[error("Update of {0} kept conflicting with concurrent writers")]
    Conflict(String),
}

/// Raw key-value storage for JSON records.
///
/// Implementations must be thread-safe. `compare_and_swap` and `write_batch`
/// are the only primitives that promise atomicity; plain `write` is a blind
/// overwrite.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read a record. Returns `None` if the key has never been written.
    async fn read(&self, key: &str) -> StoreResult<Option<String>>;

    /// Overwrite a record unconditionally.
    async fn write(&self, key: &str, contents: &str) -> StoreResult<()>;

    /// Replace a record only if its current contents equal `expected`
    /// (`None` meaning the key must not exist yet).
    ///
    /// Returns `false` without writing when the comparison fails.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        contents: &str,
    ) -> StoreResult<bool>;

    /// Write several records as one unit.
    async fn write_batch(&self, writes: &[(String, String)]) -> StoreResult<()>;

    /// List keys starting with `prefix`, sorted.
    async fn keys(&self, prefix: &str) -> StoreResult<Vec<String>>;
}

/// Outcome of loading a single typed record.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded<T> {
    Found(T),
    Missing,
    /// The record exists but could not be read or parsed.
    Corrupt(String),
}

/// Records returned by [`Collection::list`], plus how many were skipped.
#[derive(Debug)]
pub struct Listing<T> {
    pub records: Vec<(String, T)>,
    pub skipped: usize,
}

impl<T> Listing<T> {
    pub fn into_values(self) -> Vec<T> {
        self.records.into_iter().map(|(_, value)| value).collect()
    }
}

/// Maximum read-modify-write attempts before `update` gives up.
const MAX_UPDATE_ATTEMPTS: usize = 64;

/// Typed view over a [`RecordStore`].
pub struct Collection<T> {
    store: Arc<dyn RecordStore>,
    kind: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            kind: self.kind,
            _marker: PhantomData,
        }
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    /// `kind` names the record type in errors and logs ("batch", "version", ...).
    pub fn new(kind: &'static str, store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            kind,
            _marker: PhantomData,
        }
    }

    /// Load a record, classifying it as found, missing, or corrupt.
    pub async fn load(&self, key: &str) -> Result<Loaded<T>> {
        match self.store.read(key).await? {
            Some(raw) => Ok(parse_record(&raw)),
            None => Ok(Loaded::Missing),
        }
    }

    /// Load a record that must exist and parse.
    pub async fn get(&self, key: &str) -> Result<T> {
        match self.load(key).await? {
            Loaded::Found(value) => Ok(value),
            Loaded::Missing => Err(ClausewiseError::not_found(self.kind, key)),
            Loaded::Corrupt(reason) => Err(ClausewiseError::CorruptRecord {
                key: key.to_string(),
                reason,
            }),
        }
    }

    pub async fn save(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string_pretty(value)?;
        self.store.write(key, &raw).await?;
        Ok(())
    }

    /// Write several records of this collection as one unit.
    pub async fn save_all(&self, entries: &[(String, &T)]) -> Result<()> {
        let mut writes = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            writes.push((key.clone(), serde_json::to_string_pretty(value)?));
        }
        self.store.write_batch(&writes).await?;
        Ok(())
    }

    /// Read-modify-write a record with compare-and-swap, retrying on conflict.
    ///
    /// `apply` may run more than once and must only depend on the record it
    /// is given. Returns the record as written.
    pub async fn update<F>(&self, key: &str, mut apply: F) -> Result<T>
    where
        F: FnMut(&mut T) -> Result<()> + Send,
    {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let raw = self
                .store
                .read(key)
                .await?
                .ok_or_else(|| ClausewiseError::not_found(self.kind, key))?;

            let mut value: T =
                serde_json::from_str(&raw).map_err(|e| ClausewiseError::CorruptRecord {
                    key: key.to_string(),
                    reason: e.to_string(),
                })?;

            apply(&mut value)?;
            let updated = serde_json::to_string_pretty(&value)?;

            if self
                .store
                .compare_and_swap(key, Some(&raw), &updated)
                .await?
            {
                return Ok(value);
            }

            tracing::debug!(
                "Concurrent write to {} {}, retrying (attempt {})",
                self.kind,
                key,
                attempt
            );
            tokio::task::yield_now().await;
        }

        Err(StoreError::Conflict(key.to_string()).into())
    }

    /// Load every record whose key starts with `prefix`.
    ///
    /// Unreadable or unparseable records are logged and counted in
    /// [`Listing::skipped`] rather than failing the whole listing.
    pub async fn list(&self, prefix: &str) -> Result<Listing<T>> {
        let keys = self.store.keys(prefix).await?;
        let mut records = Vec::with_capacity(keys.len());
        let mut skipped = 0usize;

        for key in keys {
            let loaded = match self.store.read(&key).await {
                Ok(Some(raw)) => parse_record(&raw),
                Ok(None) => Loaded::Missing,
                Err(e) => Loaded::Corrupt(e.to_string()),
            };

            match loaded {
                Loaded::Found(value) => records.push((key, value)),
                // Deleted between listing keys and reading it.
                Loaded::Missing => {}
                Loaded::Corrupt(reason) => {
                    tracing::warn!("Skipping unreadable {} record {}: {}", self.kind, key, reason);
                    skipped += 1;
                }
            }
        }

        Ok(Listing { records, skipped })
    }
}

fn parse_record<T: DeserializeOwned>(raw: &str) -> Loaded<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Loaded::Found(value),
        Err(e) => Loaded::Corrupt(e.to_string()),
    }
}

/// Reject keys that could escape a store directory.
pub(crate) fn validate_key(key: &str) -> StoreResult<()> {
    let bad = key.is_empty()
        || key.starts_with('.')
        || key
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '\0') || c.is_control());
    if bad {
        Err(StoreError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}
