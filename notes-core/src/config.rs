//! Application configuration
//!
//! Central location for configuration constants and the JSON-backed
//! `AppConfig` that selects a storage backend at startup.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

// ===== Storage =====

/// Key under which the whole notes collection is persisted
pub const NOTES_KEY: &str = "notes";

/// Appended to the notes key to form the key that keeps a payload which
/// failed to decode
pub const CORRUPT_BACKUP_SUFFIX: &str = "corrupt";

/// File name of the SQLite database inside the data directory
pub const SQLITE_DB_FILE: &str = "hamarnote.db";

/// Busy timeout for SQLite connections in seconds
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 5;

// ===== Display =====

/// Maximum number of characters shown in a collapsed note preview
pub const PREVIEW_MAX_CHARS: usize = 30;

/// Suffix appended to a truncated preview
pub const PREVIEW_ELLIPSIS: &str = "...";

// ===== Notifications =====

/// Buffer size of the collection-changed broadcast channel.
/// Slow subscribers that fall further behind than this observe `Lagged`.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

// ===== Logging =====

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "hamarnote=debug,info";

/// Which key-value backend holds the notes collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local, lost on exit
    #[default]
    Memory,
    /// One JSON file per key under `data_dir`
    File,
    /// `kv_store` table in `data_dir/hamarnote.db`
    Sqlite,
}

/// Startup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageBackend,
    /// Required for the `file` and `sqlite` backends
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_notes_key")]
    pub notes_key: String,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_notes_key() -> String {
    NOTES_KEY.to_string()
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageBackend::default(),
            data_dir: None,
            notes_key: default_notes_key(),
            log_filter: default_log_filter(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, writing defaults if the file does not exist
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("Config file not found, writing defaults to {:?}", path);
            let default = Self::default();
            default.save(path).await?;
            return Ok(default);
        }

        let content = fs::read_to_string(path).await?;
        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse {:?}: {}", path, e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to disk
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, content).await?;
        tracing::debug!("Config saved to {:?}", path);

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.notes_key.trim().is_empty() {
            return Err(AppError::Config("notes_key must not be empty".to_string()));
        }

        if self.storage != StorageBackend::Memory && self.data_dir.is_none() {
            return Err(AppError::Config(format!(
                "{:?} storage requires data_dir",
                self.storage
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_defaults_written_on_first_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");

        let config = AppConfig::load(&path).await.unwrap();

        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.notes_key, "notes");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        let data_dir = temp.path().join("data");
        let json = serde_json::json!({
            "storage": "sqlite",
            "data_dir": data_dir,
        });
        std::fs::write(&path, json.to_string()).unwrap();

        let config = AppConfig::load(&path).await.unwrap();

        assert_eq!(config.storage, StorageBackend::Sqlite);
        assert_eq!(config.data_dir, Some(data_dir));
        assert_eq!(config.notes_key, NOTES_KEY);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[tokio::test]
    async fn test_malformed_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = AppConfig::load(&path).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_validate() {
        let mut config = AppConfig {
            storage: StorageBackend::File,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        config.data_dir = Some(PathBuf::from("/tmp/notes"));
        assert!(config.validate().is_ok());

        config.notes_key = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
