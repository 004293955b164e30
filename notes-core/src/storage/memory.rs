//! In-memory key-value storage
//!
//! Process-local backend used for ephemeral stores and tests. Reads and
//! writes can be made to fail on demand to exercise error paths.

use super::Storage;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read fail (or succeed again)
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write and remove fail (or succeed again)
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes and removes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Current blob under `key`, bypassing failure injection
    pub async fn peek(&self, key: &str) -> Option<String> {
        self.entries.read().await.get(key).cloned()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read_raw(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::StorageRead(format!("read of '{}' failed", key)));
        }
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn write_raw(&self, key: &str, blob: &str) -> Result<()> {
        // Yield so concurrent callers genuinely interleave around the write
        tokio::task::yield_now().await;

        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::StorageWrite(format!("write of '{}' failed", key)));
        }
        self.entries
            .write()
            .await
            .insert(key.to_string(), blob.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove_raw(&self, key: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::StorageWrite(format!("remove of '{}' failed", key)));
        }
        self.entries.write().await.remove(key);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_read_remove() {
        let storage = MemoryStorage::new();

        assert_eq!(storage.read_raw("notes").await.unwrap(), None);

        storage.write_raw("notes", "[]").await.unwrap();
        assert_eq!(storage.read_raw("notes").await.unwrap().as_deref(), Some("[]"));

        storage.remove_raw("notes").await.unwrap();
        assert_eq!(storage.read_raw("notes").await.unwrap(), None);
        assert_eq!(storage.write_count(), 2);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let storage = MemoryStorage::new();
        storage.write_raw("notes", "[]").await.unwrap();

        storage.fail_reads(true);
        assert!(storage.read_raw("notes").await.is_err());

        storage.fail_writes(true);
        assert!(matches!(
            storage.write_raw("notes", "[1]").await,
            Err(AppError::StorageWrite(_))
        ));
        assert_eq!(storage.peek("notes").await.as_deref(), Some("[]"));
    }
}
