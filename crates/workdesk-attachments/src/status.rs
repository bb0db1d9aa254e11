//! Status aggregator.
//!
//! Keeps the last computed [`StatusTuple`] and fans every distinct transition
//! out to subscribers. Each subscriber gets its own unbounded channel so no
//! intermediate transition is coalesced away.

use tokio::sync::mpsc;
use workdesk_core::StatusTuple;

#[derive(Debug, Default)]
pub struct StatusAggregator {
    last: StatusTuple,
    subscribers: Vec<mpsc::UnboundedSender<StatusTuple>>,
}

impl StatusAggregator {
    pub fn new(initial: StatusTuple) -> Self {
        Self {
            last: initial,
            subscribers: Vec::new(),
        }
    }

    pub fn current(&self) -> StatusTuple {
        self.last
    }

    /// Subscribe to transitions. The current tuple is delivered first.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<StatusTuple> {
        let (tx, rx) = mpsc::unbounded_channel();
        if tx.send(self.last).is_ok() {
            self.subscribers.push(tx);
        }
        rx
    }

    /// Record a freshly computed tuple. Returns whether it was a transition.
    pub fn publish(&mut self, next: StatusTuple) -> bool {
        if next == self.last {
            return false;
        }
        self.last = next;
        self.subscribers.retain(|tx| tx.send(next).is_ok());
        tracing::trace!(
            uploading = next.uploading,
            attaching = next.attaching,
            pending_count = next.pending_count,
            has_parent_id = next.has_parent_id,
            subscribers = self.subscribers.len(),
            "Status transition"
        );
        true
    }

    /// Drop all subscribers; their streams end.
    pub fn close(&mut self) {
        self.subscribers.clear();
    }
}
