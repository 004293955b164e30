//! Application state and initialization
//!
//! Installs logging from the configured filter, builds the storage
//! backend and loads the note store. A presentation layer holds one `AppState`.

use crate::config::{AppConfig, StorageBackend, SQLITE_DB_FILE};
use crate::error::{AppError, Result};
use crate::services::NoteStore;
use crate::storage::{FileStorage, MemoryStorage, SqliteStorage, Storage};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Central application state
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub notes: NoteStore,
}

impl AppState {
    /// Open storage and load notes.
    ///
    /// A failed load is not fatal: the store starts empty and the error
    /// is returned alongside the state so the UI can report it.
    pub async fn open(config: AppConfig) -> Result<(Self, Option<AppError>)> {
        if !init_logging(&config.log_filter) {
            tracing::debug!("Logging already initialized, ignoring log_filter");
        }
        tracing::info!("Initializing notes engine with {:?} storage", config.storage);

        config.validate()?;
        let storage = open_storage(&config).await?;
        let notes = NoteStore::with_key(storage, config.notes_key.clone());

        let load_error = notes.load().await.err();
        if let Some(e) = &load_error {
            tracing::warn!("Starting with an empty collection: {}", e);
        }

        tracing::info!("Notes engine initialized successfully");

        Ok((Self { config, notes }, load_error))
    }
}

/// Construct the backend selected by `config`
pub async fn open_storage(config: &AppConfig) -> Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config.storage {
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
        StorageBackend::File => {
            let store = FileStorage::new(data_dir(config)?);
            store.initialize().await?;
            Arc::new(store)
        }
        StorageBackend::Sqlite => {
            let db_path = data_dir(config)?.join(SQLITE_DB_FILE);
            Arc::new(SqliteStorage::open(&db_path).await?)
        }
    };

    Ok(storage)
}

fn data_dir(config: &AppConfig) -> Result<PathBuf> {
    config
        .data_dir
        .clone()
        .ok_or_else(|| AppError::Config(format!("{:?} storage requires data_dir", config.storage)))
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `default_filter`. Returns false if a subscriber
/// was already installed.
pub fn init_logging(default_filter: &str) -> bool {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_LOG_FILTER;
    use crate::models::NewNote;
    use tempfile::TempDir;

    #[test]
    fn test_init_logging_only_installs_once() {
        init_logging(DEFAULT_LOG_FILTER);
        assert!(!init_logging(DEFAULT_LOG_FILTER));
    }

    #[tokio::test]
    async fn test_open_memory() {
        let (state, load_error) = AppState::open(AppConfig::default()).await.unwrap();

        assert!(load_error.is_none());
        assert!(state.notes.is_empty().await);
        assert_eq!(state.notes.key(), "notes");
    }

    #[tokio::test]
    async fn test_open_installs_logging() {
        let config = AppConfig {
            log_filter: "hamarnote=trace".to_string(),
            ..AppConfig::default()
        };

        AppState::open(config).await.unwrap();

        assert!(!init_logging(DEFAULT_LOG_FILTER));
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_config() {
        let config = AppConfig {
            storage: StorageBackend::Sqlite,
            ..AppConfig::default()
        };

        let err = AppState::open(config).await.err().unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_reopen_file_backend() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig {
            storage: StorageBackend::File,
            data_dir: Some(temp.path().to_path_buf()),
            ..AppConfig::default()
        };

        {
            let (state, _) = AppState::open(config.clone()).await.unwrap();
            state.notes.add(NewNote::text("survives restart")).await.unwrap();
        }

        let (state, load_error) = AppState::open(config).await.unwrap();
        assert!(load_error.is_none());
        let notes = state.notes.snapshot().await;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].text, "survives restart");
    }

    #[tokio::test]
    async fn test_corrupt_file_opens_empty_with_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("notes.json"), "not json").unwrap();
        let config = AppConfig {
            storage: StorageBackend::File,
            data_dir: Some(temp.path().to_path_buf()),
            ..AppConfig::default()
        };

        let (state, load_error) = AppState::open(config).await.unwrap();

        assert!(matches!(load_error, Some(AppError::StorageRead(_))));
        assert!(state.notes.is_empty().await);
        let backup = std::fs::read_to_string(temp.path().join("notes.corrupt.json")).unwrap();
        assert_eq!(backup, "not json");
    }
}
