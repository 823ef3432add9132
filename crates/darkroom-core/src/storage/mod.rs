//! Object storage abstraction used by the pipeline.
//!
//! The pipeline only reads a source object, writes derivatives and moves
//! the source on publish. Transport, credentials, timeouts and retries are
//! the backend's business; any error surfacing here fails the event.

mod local;
mod memory;

pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;

use async_trait::async_trait;
use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Object storage contract.
///
/// Keys are `/`-separated, relative, and never contain `..` segments.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch a whole object.
    async fn get_object(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Write an object, replacing any existing one.
    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Move an object to a new key.
    async fn move_object(&self, from_key: &str, to_key: &str) -> StorageResult<()>;

    /// Check if an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// List object keys under a directory prefix, sorted.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;
}

/// Reject keys that could escape the store.
pub(crate) fn check_key(key: &str) -> StorageResult<()> {
    if key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|segment| segment == "..")
    {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
