//! Image record sink.
//!
//! Records are created by the upload API before the file exists; the
//! pipeline only completes them once every derivative is in place.
//! Field encryption and blind indexes live behind this trait.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex as AsyncMutex;

use crate::types::ImageRecordUpdate;

/// Error returned by a record sink.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct RecordError(pub String);

/// Write contract for the image metadata service.
#[async_trait]
pub trait ImageRecordStore: Send + Sync {
    /// Fill in the placeholder record identified by `update.slug`.
    async fn complete(&self, update: &ImageRecordUpdate) -> Result<(), RecordError>;
}

/// Appends each completed record as one JSON line.
pub struct JsonlRecordStore {
    path: PathBuf,
    // Serializes appends so concurrent workers never interleave lines
    write_lock: AsyncMutex<()>,
}

impl JsonlRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: AsyncMutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl ImageRecordStore for JsonlRecordStore {
    async fn complete(&self, update: &ImageRecordUpdate) -> Result<(), RecordError> {
        let mut line = serde_json::to_string(update).map_err(|e| RecordError(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RecordError(e.to_string()))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| RecordError(format!("open {}: {e}", self.path.display())))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| RecordError(e.to_string()))?;
        file.flush().await.map_err(|e| RecordError(e.to_string()))
    }
}

/// Keeps completed records in memory; can be told to reject writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<Mutex<Vec<ImageRecordUpdate>>>,
    fail_with: Option<String>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every write fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            records: Arc::default(),
            fail_with: Some(message.into()),
        }
    }

    pub fn records(&self) -> Vec<ImageRecordUpdate> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ImageRecordStore for MemoryRecordStore {
    async fn complete(&self, update: &ImageRecordUpdate) -> Result<(), RecordError> {
        if let Some(message) = &self.fail_with {
            return Err(RecordError(message.clone()));
        }
        self.records
            .lock()
            .map_err(|_| RecordError("record store lock poisoned".into()))?
            .push(update.clone());
        Ok(())
    }
}
