//! Attachment committer: one batched attach request, at most one in flight.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use workdesk_core::{
    AttachError, AttachOutcome, AttachPrimitive, AttachmentRequest, ParentId, PendingItem,
};

/// Proof that the holder owns the single commit slot. Released on drop.
#[derive(Debug)]
pub struct CommitPermit {
    _permit: OwnedSemaphorePermit,
}

#[derive(Clone)]
pub struct AttachmentCommitter {
    primitive: Arc<dyn AttachPrimitive>,
    slot: Arc<Semaphore>,
}

impl AttachmentCommitter {
    pub fn new(primitive: Arc<dyn AttachPrimitive>) -> Self {
        Self {
            primitive,
            slot: Arc::new(Semaphore::new(1)),
        }
    }

    /// Claim the commit slot. `None` while another commit is outstanding;
    /// the caller drops the trigger rather than queueing it.
    pub fn try_begin(&self) -> Option<CommitPermit> {
        self.slot
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| CommitPermit { _permit: permit })
    }

    pub fn in_flight(&self) -> bool {
        self.slot.available_permits() == 0
    }

    /// Attach `items` to `parent_id` in a single request.
    ///
    /// An empty batch succeeds without calling the backend. The permit is
    /// borrowed so the caller decides when the slot is released relative to
    /// its own bookkeeping.
    #[tracing::instrument(skip(self, _permit, items), fields(parent_id = %parent_id, item_count = items.len()))]
    pub async fn commit(
        &self,
        _permit: &CommitPermit,
        parent_id: &ParentId,
        items: &[PendingItem],
    ) -> Result<AttachOutcome, AttachError> {
        if items.is_empty() {
            return Ok(AttachOutcome::Acknowledged);
        }

        let body: Vec<AttachmentRequest> = items.iter().map(PendingItem::to_request).collect();
        self.primitive.attach(parent_id, &body).await
    }
}
