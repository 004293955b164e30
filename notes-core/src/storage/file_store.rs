//! File-backed key-value storage
//!
//! Each key is stored as `<root>/<key>.json`. Writes go to a temp file
//! that is synced and renamed over the target, so a crash mid-write
//! leaves the previous blob intact.

use super::Storage;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create a file store rooted at the given directory
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Initialize the store (create directory if needed)
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        tracing::info!("File storage initialized at: {:?}", self.root);
        Ok(())
    }

    /// Get file path for a key
    fn get_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');

        if !valid {
            return Err(AppError::Config(format!("Invalid storage key: {:?}", key)));
        }

        Ok(self.root.join(format!("{}.json", key)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn read_raw(&self, key: &str) -> Result<Option<String>> {
        let path = self.get_path(key)?;

        match fs::read_to_string(&path).await {
            Ok(blob) => {
                tracing::debug!("Read {} ({} bytes)", key, blob.len());
                Ok(Some(blob))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::StorageRead(format!("{:?}: {}", path, e))),
        }
    }

    async fn write_raw(&self, key: &str, blob: &str) -> Result<()> {
        let path = self.get_path(key)?;

        let write = async {
            fs::create_dir_all(&self.root).await?;

            // Write to temp file first (atomic write)
            let temp_path = path.with_extension("json.tmp");
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(blob.as_bytes()).await?;
            file.sync_all().await?;

            fs::rename(temp_path, &path).await
        };

        write
            .await
            .map_err(|e| AppError::StorageWrite(format!("{:?}: {}", path, e)))?;

        tracing::debug!("Wrote {} ({} bytes)", key, blob.len());
        Ok(())
    }

    async fn remove_raw(&self, key: &str) -> Result<()> {
        let path = self.get_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("Removed {}", key);
                Ok(())
            }
            // Already removed
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::StorageWrite(format!("{:?}: {}", path, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (FileStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStorage::new(temp_dir.path().join("kv"));
        store.initialize().await.unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let (store, _temp) = create_test_store().await;

        store.write_raw("notes", r#"[{"a":1}]"#).await.unwrap();

        let blob = store.read_raw("notes").await.unwrap();
        assert_eq!(blob.as_deref(), Some(r#"[{"a":1}]"#));
        assert!(store.root().join("notes.json").exists());
        assert!(!store.root().join("notes.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_key_reads_none() {
        let (store, _temp) = create_test_store().await;
        assert_eq!(store.read_raw("notes").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_blob() {
        let (store, _temp) = create_test_store().await;

        store.write_raw("notes", "[1,2,3]").await.unwrap();
        store.write_raw("notes", "[]").await.unwrap();

        assert_eq!(store.read_raw("notes").await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (store, _temp) = create_test_store().await;

        store.write_raw("notes", "[]").await.unwrap();
        store.remove_raw("notes").await.unwrap();
        store.remove_raw("notes").await.unwrap();

        assert_eq!(store.read_raw("notes").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let (store, _temp) = create_test_store().await;

        assert!(store.read_raw("../escape").await.is_err());
        assert!(store.write_raw("a/b", "[]").await.is_err());
        assert!(store.write_raw("", "[]").await.is_err());
    }
}
