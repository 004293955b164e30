//! Storage module
//!
//! Coarse-grained key-value persistence. The note store writes its whole
//! collection under one key; backends never see partial updates.

pub mod file_store;
pub mod memory;
pub mod sqlite;

pub use file_store::FileStorage;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use crate::error::Result;
use async_trait::async_trait;

/// Key-value persistence collaborator
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the blob stored under `key`, `None` if it was never written or was removed
    async fn read_raw(&self, key: &str) -> Result<Option<String>>;

    /// Replace the blob stored under `key`
    async fn write_raw(&self, key: &str, blob: &str) -> Result<()>;

    /// Remove `key`; removing an absent key succeeds
    async fn remove_raw(&self, key: &str) -> Result<()>;
}
