//! Derived note view
//!
//! Pure filter and sort pipeline from a collection snapshot to the list a
//! screen displays. Nothing here is persisted; the view is recomputed
//! whenever the snapshot or the query changes.

use crate::error::{AppError, Result};
use crate::models::Note;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category tab selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    All,
    Favorites,
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Category::All),
            "favorites" => Ok(Category::Favorites),
            other => Err(AppError::Validation(format!("Unknown category: {}", other))),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::All => write!(f, "all"),
            Category::Favorites => write!(f, "favorites"),
        }
    }
}

/// Order of the `created_at` sort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Newest first
    #[default]
    Desc,
    Asc,
}

impl SortOrder {
    /// The other direction, as flipped by the sort button
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Desc => SortOrder::Asc,
            SortOrder::Asc => SortOrder::Desc,
        }
    }
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "desc" => Ok(SortOrder::Desc),
            "asc" => Ok(SortOrder::Asc),
            other => Err(AppError::Validation(format!("Unknown sort order: {}", other))),
        }
    }
}

/// Search text, category and sort order chosen in the UI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub sort: SortOrder,
}

impl ViewQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }
}

/// Ordered display list derived from a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteView {
    notes: Vec<Note>,
}

impl NoteView {
    pub fn derive(snapshot: &[Note], query: &ViewQuery) -> Self {
        let needle = query.search.trim().to_lowercase();

        let mut notes: Vec<Note> = snapshot
            .iter()
            .filter(|note| needle.is_empty() || note.matches_lowercase(&needle))
            .filter(|note| match query.category {
                Category::All => true,
                Category::Favorites => note.favorite,
            })
            .cloned()
            .collect();

        // sort_by is stable: equal timestamps keep insertion order either way
        match query.sort {
            SortOrder::Desc => notes.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::Asc => notes.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        }

        tracing::trace!(
            total = snapshot.len(),
            shown = notes.len(),
            category = %query.category,
            "Derived note view"
        );

        Self { notes }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// True when the screen should show its "no notes" state
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Note> {
        self.notes.iter()
    }
}

impl<'a> IntoIterator for &'a NoteView {
    type Item = &'a Note;
    type IntoIter = std::slice::Iter<'a, Note>;

    fn into_iter(self) -> Self::IntoIter {
        self.notes.iter()
    }
}
