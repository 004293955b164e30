//! Collection-changed notifications
//!
//! Every successful store mutation publishes a [`NoteEvent`] carrying
//! what changed and the resulting snapshot. Subscribers that fall behind
//! the channel capacity receive `Lagged` and should re-read the latest
//! snapshot from the store.

use crate::models::NoteSnapshot;
use tokio::sync::broadcast;

/// What a mutation did to the collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteChange {
    /// Collection replaced from storage
    Loaded,
    Added(String),
    Updated(String),
    Removed(String),
    Cleared,
}

#[derive(Debug, Clone)]
pub struct NoteEvent {
    pub change: NoteChange,
    pub snapshot: NoteSnapshot,
}

/// Broadcast channel for collection-changed events
pub struct EventBus {
    tx: broadcast::Sender<NoteEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event. Without subscribers the event is dropped.
    pub fn emit(&self, change: NoteChange, snapshot: NoteSnapshot) {
        tracing::debug!(
            ?change,
            notes = snapshot.len(),
            subscribers = self.tx.receiver_count(),
            "Collection changed"
        );
        let _ = self.tx.send(NoteEvent { change, snapshot });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NoteEvent> {
        self.tx.subscribe()
    }
}
