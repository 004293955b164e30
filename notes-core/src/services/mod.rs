//! Services module
//!
//! The note store and the view derived from it.

pub mod notes;
pub mod view;

pub use notes::NoteStore;
pub use view::{Category, NoteView, SortOrder, ViewQuery};
