//! Note store
//!
//! Owns the canonical note list and persists the whole collection after
//! every mutation. Mutations are serialized through a fair async mutex, so
//! each one observes every mutation queued before it, and each runs on
//! its own task so it completes even if the caller stops waiting.
//! A failed write leaves the in-memory list at the last persisted state.

use crate::codec;
use crate::config::{CORRUPT_BACKUP_SUFFIX, EVENT_CHANNEL_CAPACITY, NOTES_KEY};
use crate::error::{AppError, Result};
use crate::events::{EventBus, NoteChange, NoteEvent};
use crate::models::{NewNote, Note, NoteKind, NotePatch, NoteSnapshot};
use crate::services::view::{NoteView, ViewQuery};
use crate::storage::Storage;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// Storage-backed note collection
#[derive(Clone)]
pub struct NoteStore {
    inner: Arc<Inner>,
}

struct Inner {
    storage: Arc<dyn Storage>,
    key: String,
    notes: Mutex<NoteSnapshot>,
    events: EventBus,
}

impl NoteStore {
    /// Create an empty store persisting under the default key.
    /// Call [`NoteStore::load`] to pick up previously saved notes.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_key(storage, NOTES_KEY)
    }

    pub fn with_key(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                storage,
                key: key.into(),
                notes: Mutex::new(Arc::from(Vec::new())),
                events: EventBus::new(EVENT_CHANNEL_CAPACITY),
            }),
        }
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Key holding the last payload that failed to decode
    pub fn backup_key(&self) -> String {
        self.inner.backup_key()
    }

    /// Replace the in-memory list with the persisted collection.
    ///
    /// On a failed read or an unparsable payload the store is left empty
    /// and the error is returned. An unparsable payload is first copied to
    /// [`NoteStore::backup_key`], since the next mutation overwrites `key`.
    pub async fn load(&self) -> Result<()> {
        let inner = &self.inner;
        let mut guard = inner.notes.lock().await;

        let loaded = match inner.storage.read_raw(&inner.key).await {
            Ok(Some(blob)) => {
                let decoded = codec::decode(&blob);
                if decoded.is_err() {
                    inner.back_up_unreadable(&blob).await;
                }
                decoded
            }
            Ok(None) => Ok(codec::Decoded {
                notes: Vec::new(),
                upgraded: false,
            }),
            Err(e) => Err(storage_read_error(e)),
        };

        let decoded = match loaded {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!("Failed to load notes, starting empty: {}", e);
                let empty: NoteSnapshot = Arc::from(Vec::new());
                *guard = empty.clone();
                inner.events.emit(NoteChange::Loaded, empty);
                return Err(e);
            }
        };

        let snapshot: NoteSnapshot = Arc::from(decoded.notes);

        if decoded.upgraded {
            tracing::info!("Upgrading {} stored notes to the current format", snapshot.len());
            if let Err(e) = inner.persist(&snapshot).await {
                tracing::warn!("Failed to rewrite upgraded notes: {}", e);
            }
        }

        tracing::info!("Loaded {} notes", snapshot.len());

        *guard = snapshot.clone();
        inner.events.emit(NoteChange::Loaded, snapshot);

        Ok(())
    }

    /// Create a note with a fresh id and append it to the collection
    pub async fn add(&self, input: NewNote) -> Result<Note> {
        input.validate()?;

        self.mutate(move |notes| {
            let now = Utc::now();
            let note = Note {
                id: codec::new_note_id(),
                kind: input.kind,
                text: input.text.unwrap_or_default(),
                media_ref: input.media_ref,
                created_at: now,
                updated_at: now,
                pinned: input.pinned,
                favorite: false,
            };

            notes.push(note.clone());
            tracing::info!("Created {:?} note: {}", note.kind, note.id);

            let change = NoteChange::Added(note.id.clone());
            Ok((note, change))
        })
        .await
    }

    /// Replace a note's text and bump `updated_at`
    pub async fn update(&self, id: &str, patch: NotePatch) -> Result<Note> {
        let id = id.to_string();

        self.mutate(move |notes| {
            let note = find_mut(notes, &id)?;

            if let Some(text) = patch.text {
                if note.kind == NoteKind::Text && text.trim().is_empty() {
                    return Err(AppError::Validation("Note cannot be empty".to_string()));
                }
                note.text = text;
            }
            note.updated_at = Utc::now();

            tracing::debug!("Updated note: {}", id);
            Ok((note.clone(), NoteChange::Updated(id)))
        })
        .await
    }

    /// Delete a note permanently
    pub async fn remove(&self, id: &str) -> Result<()> {
        let id = id.to_string();

        self.mutate(move |notes| {
            let index = position(notes, &id)?;
            notes.remove(index);

            tracing::info!("Deleted note: {}", id);
            Ok(((), NoteChange::Removed(id)))
        })
        .await
    }

    /// Delete every note
    pub async fn clear_all(&self) -> Result<()> {
        self.mutate(|notes| {
            tracing::info!("Clearing {} notes", notes.len());
            notes.clear();
            Ok(((), NoteChange::Cleared))
        })
        .await
    }

    pub async fn toggle_favorite(&self, id: &str) -> Result<Note> {
        let id = id.to_string();

        self.mutate(move |notes| {
            let note = find_mut(notes, &id)?;
            note.favorite = !note.favorite;

            tracing::debug!("Note {} favorite = {}", id, note.favorite);
            Ok((note.clone(), NoteChange::Updated(id)))
        })
        .await
    }

    pub async fn toggle_pinned(&self, id: &str) -> Result<Note> {
        let id = id.to_string();

        self.mutate(move |notes| {
            let note = find_mut(notes, &id)?;
            note.pinned = !note.pinned;

            tracing::debug!("Note {} pinned = {}", id, note.pinned);
            Ok((note.clone(), NoteChange::Updated(id)))
        })
        .await
    }

    /// Get a note by ID
    pub async fn get(&self, id: &str) -> Result<Note> {
        self.snapshot()
            .await
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or_else(|| AppError::NoteNotFound(id.to_string()))
    }

    /// Immutable copy of the canonical list in insertion order
    pub async fn snapshot(&self) -> NoteSnapshot {
        self.inner.notes.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.notes.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Derive the display list for the given search, category and sort order
    pub async fn view(&self, query: &ViewQuery) -> NoteView {
        NoteView::derive(&self.snapshot().await, query)
    }

    /// Receive a [`NoteEvent`] after every successful mutation and load
    pub fn subscribe(&self) -> broadcast::Receiver<NoteEvent> {
        self.inner.events.subscribe()
    }

    /// Apply `op` to a copy of the list, persist it, then commit and notify.
    async fn mutate<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Vec<Note>) -> Result<(T, NoteChange)> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);

        let task = tokio::spawn(async move {
            let mut guard = inner.notes.lock().await;

            let mut next = guard.to_vec();
            let (output, change) = op(&mut next)?;
            let next: NoteSnapshot = Arc::from(next);

            if let Err(e) = inner.persist(&next).await {
                tracing::warn!("Write failed, keeping last persisted notes: {}", e);
                return Err(e);
            }

            *guard = next.clone();
            inner.events.emit(change, next);

            Ok::<T, AppError>(output)
        });

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(AppError::StorageWrite(format!("mutation aborted: {}", e))),
        }
    }
}

impl Inner {
    async fn persist(&self, notes: &[Note]) -> Result<()> {
        let blob = codec::encode(notes)?;

        self.storage
            .write_raw(&self.key, &blob)
            .await
            .map_err(storage_write_error)
    }

    fn backup_key(&self) -> String {
        format!("{}.{}", self.key, CORRUPT_BACKUP_SUFFIX)
    }

    async fn back_up_unreadable(&self, blob: &str) {
        let backup_key = self.backup_key();
        match self.storage.write_raw(&backup_key, blob).await {
            Ok(()) => tracing::warn!("Kept unreadable notes payload under {}", backup_key),
            Err(e) => tracing::warn!("Failed to back up unreadable notes payload: {}", e),
        }
    }
}

fn position(notes: &[Note], id: &str) -> Result<usize> {
    notes
        .iter()
        .position(|n| n.id == id)
        .ok_or_else(|| AppError::NoteNotFound(id.to_string()))
}

fn find_mut<'a>(notes: &'a mut [Note], id: &str) -> Result<&'a mut Note> {
    let index = position(notes, id)?;
    Ok(&mut notes[index])
}

fn storage_read_error(e: AppError) -> AppError {
    match e {
        AppError::StorageRead(_) => e,
        other => AppError::StorageRead(other.to_string()),
    }
}

fn storage_write_error(e: AppError) -> AppError {
    match e {
        AppError::StorageWrite(_) => e,
        other => AppError::StorageWrite(other.to_string()),
    }
}
