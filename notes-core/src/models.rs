//! Note models
//!
//! Rust structs representing the single persisted entity and the requests
//! that create or modify it. `Note` serializes to the stored wire shape.

use crate::config::{PREVIEW_ELLIPSIS, PREVIEW_MAX_CHARS};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Immutable copy of the canonical list at a point in time
pub type NoteSnapshot = Arc<[Note]>;

/// How a note is rendered and which fields carry meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    #[default]
    Text,
    /// Audio recording referenced by `media_ref`
    Voice,
}

/// A text or voice note
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NoteKind,
    pub text: String,
    /// URI of the externally stored recording, voice notes only
    #[serde(rename = "uri", skip_serializing_if = "Option::is_none")]
    pub media_ref: Option<String>,
    #[serde(rename = "date")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    pub pinned: bool,
    pub favorite: bool,
}

impl Note {
    pub fn is_voice(&self) -> bool {
        self.kind == NoteKind::Voice
    }

    /// Collapsed-list preview: the first 30 characters followed by `...`.
    /// Voice notes have no textual preview.
    pub fn preview(&self) -> String {
        if self.is_voice() {
            return String::new();
        }

        if self.text.chars().count() > PREVIEW_MAX_CHARS {
            let head: String = self.text.chars().take(PREVIEW_MAX_CHARS).collect();
            format!("{}{}", head, PREVIEW_ELLIPSIS)
        } else {
            self.text.clone()
        }
    }

    /// Plain string handed to clipboard and share collaborators
    pub fn share_text(&self) -> &str {
        &self.text
    }

    /// Case-insensitive substring match against an already lowercased needle.
    /// Voice note text never takes part in search.
    pub(crate) fn matches_lowercase(&self, needle: &str) -> bool {
        !self.is_voice() && self.text.to_lowercase().contains(needle)
    }
}

/// Create note request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewNote {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub kind: NoteKind,
    #[serde(default)]
    pub media_ref: Option<String>,
    #[serde(default)]
    pub pinned: bool,
}

impl NewNote {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            kind: NoteKind::Text,
            ..Self::default()
        }
    }

    /// A finished recording, identified by the URI the media layer returned
    pub fn voice(media_ref: impl Into<String>) -> Self {
        Self {
            kind: NoteKind::Voice,
            media_ref: Some(media_ref.into()),
            ..Self::default()
        }
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }

    pub fn validate(&self) -> Result<()> {
        match self.kind {
            NoteKind::Text => {
                let blank = self.text.as_deref().map_or(true, |t| t.trim().is_empty());
                if blank {
                    return Err(AppError::Validation("Note cannot be empty".to_string()));
                }
                if self.media_ref.is_some() {
                    return Err(AppError::Validation(
                        "Text notes cannot reference media".to_string(),
                    ));
                }
            }
            NoteKind::Voice => {
                let missing = self.media_ref.as_deref().map_or(true, |m| m.trim().is_empty());
                if missing {
                    return Err(AppError::Validation(
                        "Voice notes require a recording URI".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Update note request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotePatch {
    #[serde(default)]
    pub text: Option<String>,
}

impl NotePatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_note(text: &str) -> Note {
        let now = Utc::now();
        Note {
            id: "n1".to_string(),
            kind: NoteKind::Text,
            text: text.to_string(),
            media_ref: None,
            created_at: now,
            updated_at: now,
            pinned: false,
            favorite: false,
        }
    }

    #[test]
    fn test_preview_truncates_long_text() {
        let note = text_note("This sentence is definitely longer than thirty characters");
        assert_eq!(note.preview(), "This sentence is definitely lo...");

        let short = text_note("buy milk");
        assert_eq!(short.preview(), "buy milk");
        assert_eq!(note.share_text(), note.text);
    }

    #[test]
    fn test_preview_counts_characters_not_bytes() {
        let note = text_note(&"é".repeat(31));
        assert_eq!(note.preview(), format!("{}...", "é".repeat(30)));
    }

    #[test]
    fn test_voice_note_has_no_preview_and_never_matches() {
        let mut note = text_note("recording about milk");
        note.kind = NoteKind::Voice;
        note.media_ref = Some("file:///voice.m4a".to_string());

        assert_eq!(note.preview(), "");
        assert!(!note.matches_lowercase("milk"));
    }

    #[test]
    fn test_validate_new_note() {
        assert!(NewNote::text("hello").validate().is_ok());
        assert!(NewNote::text("   ").validate().unwrap_err().is_validation());
        assert!(NewNote::default().validate().unwrap_err().is_validation());
        assert!(NewNote::voice("file:///a.m4a").validate().is_ok());
        assert!(NewNote::voice("").validate().unwrap_err().is_validation());

        let mut with_media = NewNote::text("hello");
        with_media.media_ref = Some("file:///a.m4a".to_string());
        assert!(with_media.validate().is_err());
    }

    #[test]
    fn test_serialized_shape() {
        let note = text_note("hello");
        let value = serde_json::to_value(&note).unwrap();

        assert_eq!(value["type"], "text");
        assert_eq!(value["text"], "hello");
        assert_eq!(value["favorite"], false);
        assert!(value["date"].is_string());
        assert!(value["updatedAt"].is_string());
        assert!(value.get("uri").is_none());
    }
}
