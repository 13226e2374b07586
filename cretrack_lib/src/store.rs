//! Persistence gateway: an opaque key-value blob store holding the three
//! serialized collections.

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::db::DbError;

/// Key of the serialized LLC collection.
pub const LLCS_KEY: &str = "llcs";
/// Key of the serialized Client collection.
pub const CLIENTS_KEY: &str = "clients";
/// Key of the serialized Property collection.
pub const PROPERTIES_KEY: &str = "properties";

/// Error types for blob store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] DbError),
}

/// Load/save of serialized blobs by fixed key.
pub trait BlobStore {
    /// Returns the blob stored under `key`, or `None` when nothing was saved yet.
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `blob` under `key`, replacing any previous value.
    fn save(&self, key: &str, blob: &str) -> Result<(), StoreError>;

    /// Stores several blobs. Durable backends override this to write them
    /// atomically.
    fn save_many(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        for (key, blob) in entries {
            self.save(key, blob)?;
        }
        Ok(())
    }
}

impl<T: BlobStore + ?Sized> BlobStore for &T {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).load(key)
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), StoreError> {
        (**self).save(key, blob)
    }

    fn save_many(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        (**self).save_many(entries)
    }
}

/// Load one collection. An absent key yields an empty collection; a blob
/// that does not parse is logged and also treated as empty.
pub fn load_collection<T, S>(store: &S, key: &str) -> Result<Vec<T>, StoreError>
where
    T: DeserializeOwned,
    S: BlobStore + ?Sized,
{
    let Some(blob) = store.load(key)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Vec<T>>(&blob) {
        Ok(items) => Ok(items),
        Err(e) => {
            tracing::warn!("Discarding unreadable '{}' blob: {}", key, e);
            Ok(Vec::new())
        }
    }
}

/// Thread-safe in-memory blob store.
///
/// Holds the same serialized JSON the durable store would, so tests exercise
/// the full serialization path.
#[derive(Default)]
pub struct MemoryStore {
    store: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes all entries from the store.
    pub fn clear(&self) {
        self.store.clear();
    }
}

impl BlobStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.store.get(key).map(|entry| entry.value().clone()))
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), StoreError> {
        self.store.insert(key.to_string(), blob.to_string());
        Ok(())
    }
}
