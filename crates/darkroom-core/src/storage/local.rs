//! Filesystem-backed object store.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

use super::{check_key, ObjectStore, StorageError, StorageResult};

/// Object store rooted at a local directory; keys map to relative paths.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create the store, creating the root directory if needed.
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::Backend(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        check_key(key)?;
        Ok(self.root.join(key))
    }

    async fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

fn not_found_or_io(key: &str, err: std::io::Error) -> StorageError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(key.to_string())
    } else {
        StorageError::Io(err)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get_object(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(key)?;
        fs::read(&path).await.map_err(|e| not_found_or_io(key, e))
    }

    async fn put_object(&self, key: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        Self::ensure_parent_dir(&path).await?;
        // Write to a sibling temp file first so readers never see half an object
        let mut tmp = path.clone().into_os_string();
        tmp.push(".partial");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, &data).await?;
        fs::rename(&tmp, &path).await?;
        tracing::trace!(key, bytes = data.len(), "Stored object");
        Ok(())
    }

    async fn move_object(&self, from_key: &str, to_key: &str) -> StorageResult<()> {
        let from = self.key_to_path(from_key)?;
        let to = self.key_to_path(to_key)?;
        if !fs::try_exists(&from).await? {
            return Err(StorageError::NotFound(from_key.to_string()));
        }
        Self::ensure_parent_dir(&to).await?;
        fs::rename(&from, &to)
            .await
            .map_err(|e| not_found_or_io(from_key, e))
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let prefix = prefix.trim_matches('/');
        let base = if prefix.is_empty() {
            self.root.clone()
        } else {
            self.key_to_path(prefix)?
        };
        let root = self.root.clone();

        tokio::task::spawn_blocking(move || {
            if !base.is_dir() {
                return Ok(Vec::new());
            }
            let mut keys = Vec::new();
            for entry in WalkDir::new(&base).follow_links(false) {
                let entry = entry.map_err(|e| StorageError::Backend(e.to_string()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                if entry.path().extension().is_some_and(|ext| ext == "partial") {
                    continue;
                }
                if let Ok(relative) = entry.path().strip_prefix(&root) {
                    let key: Vec<String> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    keys.push(key.join("/"));
                }
            }
            keys.sort();
            Ok(keys)
        })
        .await
        .map_err(|e| StorageError::Backend(format!("List task failed: {e}")))?
    }
}
