//! HamarNote library
//!
//! The notes collection engine: a storage-backed note store with
//! serialized mutations, and the filter/sort view screens render from it.

pub mod app;
pub mod codec;
pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod models;
pub mod services;
pub mod storage;

pub use app::AppState;
pub use error::{AppError, Result};
pub use models::{NewNote, Note, NoteKind, NotePatch, NoteSnapshot};
pub use services::{Category, NoteStore, NoteView, SortOrder, ViewQuery};
