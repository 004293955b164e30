//! Collection payload codec
//!
//! The whole note list is stored as one JSON array under a single key.
//! Decoding also accepts records written before notes carried an `id`
//! or `updatedAt`, upgrading them in memory and reporting that a rewrite
//! is needed.

use crate::error::{AppError, Result};
use crate::models::{Note, NoteKind};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use uuid::Uuid;

/// Stored record as it may appear on disk, old or new
#[derive(Debug, Deserialize)]
struct StoredNote {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<NoteKind>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    uri: Option<String>,
    date: DateTime<Utc>,
    #[serde(rename = "updatedAt", default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pinned: bool,
    #[serde(default)]
    favorite: bool,
}

/// Result of decoding a stored collection
#[derive(Debug)]
pub struct Decoded {
    pub notes: Vec<Note>,
    /// True when any record was missing fields or shared an id with an
    /// earlier record; the caller should persist `notes` again.
    pub upgraded: bool,
}

pub fn new_note_id() -> String {
    Uuid::new_v4().to_string()
}

/// Serialize the full collection
pub fn encode(notes: &[Note]) -> Result<String> {
    Ok(serde_json::to_string(notes)?)
}

/// Parse a stored collection blob
pub fn decode(blob: &str) -> Result<Decoded> {
    let records: Vec<StoredNote> = serde_json::from_str(blob)
        .map_err(|e| AppError::StorageRead(format!("Invalid notes payload: {}", e)))?;

    let mut seen = HashSet::with_capacity(records.len());
    let mut upgraded = false;
    let mut notes = Vec::with_capacity(records.len());

    for record in records {
        let id = match record.id {
            Some(id) if !id.is_empty() && !seen.contains(&id) => id,
            _ => {
                upgraded = true;
                new_note_id()
            }
        };
        seen.insert(id.clone());

        if record.kind.is_none() || record.text.is_none() || record.updated_at.is_none() {
            upgraded = true;
        }

        let kind = record.kind.unwrap_or_default();
        let media_ref = match kind {
            NoteKind::Voice => match record.uri {
                Some(uri) if !uri.trim().is_empty() => Some(uri),
                _ => {
                    return Err(AppError::StorageRead(format!(
                        "Voice note {} has no recording URI",
                        id
                    )))
                }
            },
            NoteKind::Text => None,
        };

        notes.push(Note {
            id,
            kind,
            text: record.text.unwrap_or_default(),
            media_ref,
            created_at: record.date,
            updated_at: record.updated_at.unwrap_or(record.date),
            pinned: record.pinned,
            favorite: record.favorite,
        });
    }

    Ok(Decoded { notes, upgraded })
}
