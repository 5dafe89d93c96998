use super::{EntryId, EntryStore, HeadInput};
use std::sync::Arc;

/// Handle returned by `register`, bound to one entry.
///
/// Dropping the handle does not dispose the entry.
#[derive(Debug, Clone)]
pub struct EntryHandle {
    id: EntryId,
    store: Arc<EntryStore>,
}

impl EntryHandle {
    pub(super) fn new(id: EntryId, store: Arc<EntryStore>) -> Self {
        Self { id, store }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Replace the entry's input. No-op once disposed.
    pub fn patch(&self, input: impl Into<HeadInput>) -> bool {
        self.store.patch(self.id, input)
    }

    /// Remove the entry. Idempotent.
    pub fn dispose(&self) -> bool {
        self.store.dispose(self.id)
    }

    /// Whether the entry is still registered.
    pub fn is_active(&self) -> bool {
        self.store.contains(self.id)
    }
}
