//! SQLite-backed key-value storage

use super::Storage;
use crate::database::{create_memory_pool, create_pool, Repository};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::path::Path;

#[derive(Clone)]
pub struct SqliteStorage {
    repo: Repository,
}

impl SqliteStorage {
    /// Open (creating and migrating if needed) the database at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = create_pool(db_path).await?;
        Ok(Self {
            repo: Repository::new(pool),
        })
    }

    pub async fn in_memory() -> Result<Self> {
        let pool = create_memory_pool().await?;
        Ok(Self {
            repo: Repository::new(pool),
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn read_raw(&self, key: &str) -> Result<Option<String>> {
        self.repo
            .get_value(key)
            .await
            .map_err(|e| AppError::StorageRead(e.to_string()))
    }

    async fn write_raw(&self, key: &str, blob: &str) -> Result<()> {
        self.repo
            .set_value(key, blob)
            .await
            .map_err(|e| AppError::StorageWrite(e.to_string()))
    }

    async fn remove_raw(&self, key: &str) -> Result<()> {
        self.repo
            .delete_value(key)
            .await
            .map(|_| ())
            .map_err(|e| AppError::StorageWrite(e.to_string()))
    }
}
