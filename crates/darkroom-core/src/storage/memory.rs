//! In-memory object store, used by tests and dry runs.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{check_key, ObjectStore, StorageError, StorageResult};

/// A stored object with the content type it was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Object store keeping everything in a shared map.
///
/// Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<Mutex<BTreeMap<String, StoredObject>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> StorageResult<MutexGuard<'_, BTreeMap<String, StoredObject>>> {
        self.objects
            .lock()
            .map_err(|_| StorageError::Backend("memory store lock poisoned".into()))
    }

    /// Insert an object directly.
    pub fn insert(&self, key: impl Into<String>, data: Vec<u8>, content_type: &str) {
        if let Ok(mut objects) = self.objects() {
            objects.insert(
                key.into(),
                StoredObject {
                    data,
                    content_type: content_type.to_string(),
                },
            );
        }
    }

    /// Snapshot of an object.
    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects().ok()?.get(key).cloned()
    }

    /// All keys currently stored.
    pub fn keys(&self) -> Vec<String> {
        self.objects()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_object(&self, key: &str) -> StorageResult<Vec<u8>> {
        check_key(key)?;
        self.objects()?
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        check_key(key)?;
        self.objects()?.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn move_object(&self, from_key: &str, to_key: &str) -> StorageResult<()> {
        check_key(from_key)?;
        check_key(to_key)?;
        let mut objects = self.objects()?;
        let object = objects
            .remove(from_key)
            .ok_or_else(|| StorageError::NotFound(from_key.to_string()))?;
        objects.insert(to_key.to_string(), object);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        check_key(key)?;
        Ok(self.objects()?.contains_key(key))
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let prefix = prefix.trim_matches('/');
        let objects = self.objects()?;
        Ok(objects
            .keys()
            .filter(|key| prefix.is_empty() || key.starts_with(&format!("{prefix}/")))
            .cloned()
            .collect())
    }
}
