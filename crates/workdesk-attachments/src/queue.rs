//! Pending queue of uploaded-but-unattached references.
//!
//! Ordered most-recent-first. An item in the queue has never been committed;
//! items leave only through a successful commit or an explicit user removal.

use workdesk_core::{PendingItem, PendingItemId};

#[derive(Debug, Default, Clone)]
pub struct PendingQueue {
    items: Vec<PendingItem>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the head so the newest upload is shown first.
    pub fn append(&mut self, item: PendingItem) {
        self.items.insert(0, item);
    }

    /// User-initiated removal. Only forgets the local reference.
    pub fn remove_at(&mut self, index: usize) -> Option<PendingItem> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    /// Take every item and clear the queue.
    pub fn drain(&mut self) -> Vec<PendingItem> {
        std::mem::take(&mut self.items)
    }

    /// Remove exactly the items of a committed snapshot, keeping anything
    /// appended after the snapshot was taken.
    pub fn drain_committed(&mut self, committed: &[PendingItemId]) -> Vec<PendingItem> {
        let (drained, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.items)
            .into_iter()
            .partition(|item| committed.contains(&item.id));
        self.items = kept;
        drained
    }

    pub fn peek(&self) -> &[PendingItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
