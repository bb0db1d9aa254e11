//! Attachment session: the single owner of one parent record's pending queue.
//!
//! All mutation happens under one `std::sync::Mutex` that is never held across
//! an `.await`. Commits run as spawned tasks, so every operation that can
//! trigger reconciliation must be called from within a Tokio runtime.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use workdesk_core::{
    AssetFile, AssetKind, AttachError, AttachOutcome, AttachedFile, ErrorMetadata, ListPrimitive,
    LogLevel, ParentId, PendingItem, PendingItemId, PipelineConfig, StatusTuple, UploadError,
};

use crate::committer::{AttachmentCommitter, CommitPermit};
use crate::queue::PendingQueue;
use crate::reconcile::{self, Decision};
use crate::status::StatusAggregator;
use crate::uploader::AssetUploader;

struct SessionState {
    queue: PendingQueue,
    parent_id: Option<ParentId>,
    uploads_in_flight: usize,
    /// Queue or parent changed while a commit was outstanding.
    changed_during_commit: bool,
    attached: Vec<AttachedFile>,
    last_error: Option<String>,
    closed: bool,
    status: StatusAggregator,
}

struct Inner {
    state: Mutex<SessionState>,
    uploader: AssetUploader,
    committer: AttachmentCommitter,
    lister: Option<Arc<dyn ListPrimitive>>,
    batch_upload_limit: usize,
}

/// Cheaply cloneable handle to one "create/edit parent record" session.
#[derive(Clone)]
pub struct AttachmentSession {
    inner: Arc<Inner>,
}

impl AttachmentSession {
    pub fn new(
        uploader: AssetUploader,
        committer: AttachmentCommitter,
        config: &PipelineConfig,
    ) -> Self {
        Self::build(uploader, committer, None, config)
    }

    /// Session that refreshes its attached-file list through `lister` after
    /// commits acknowledged without an echoed list.
    pub fn with_lister(
        uploader: AssetUploader,
        committer: AttachmentCommitter,
        lister: Arc<dyn ListPrimitive>,
        config: &PipelineConfig,
    ) -> Self {
        Self::build(uploader, committer, Some(lister), config)
    }

    fn build(
        uploader: AssetUploader,
        committer: AttachmentCommitter,
        lister: Option<Arc<dyn ListPrimitive>>,
        config: &PipelineConfig,
    ) -> Self {
        let state = SessionState {
            queue: PendingQueue::new(),
            parent_id: None,
            uploads_in_flight: 0,
            changed_during_commit: false,
            attached: Vec::new(),
            last_error: None,
            closed: false,
            status: StatusAggregator::default(),
        };
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                uploader,
                committer,
                lister,
                batch_upload_limit: config.batch_upload_limit,
            }),
        }
    }

    /// Upload one file through the control for `kind`.
    ///
    /// On success the reference is appended to the pending queue, which
    /// re-evaluates reconciliation; with a known parent id the commit starts
    /// immediately. On failure nothing is queued.
    pub async fn upload(&self, file: AssetFile, kind: AssetKind) -> Result<PendingItemId, UploadError> {
        let guard = {
            let mut state = self.inner.lock();
            if state.closed {
                return Err(UploadError::SessionClosed);
            }
            state.uploads_in_flight += 1;
            self.inner.publish(&mut state);
            UploadGuard {
                inner: &self.inner,
                armed: true,
            }
        };

        let result = self.inner.uploader.upload(&file, kind).await;
        guard.settle(result, file.file_name, kind)
    }

    /// Upload a multi-select batch strictly one after another.
    ///
    /// Each file's outcome is reported independently; a failure does not stop
    /// the rest of the batch.
    pub async fn upload_batch(
        &self,
        files: Vec<AssetFile>,
        kind: AssetKind,
    ) -> Result<Vec<Result<PendingItemId, UploadError>>, UploadError> {
        let max = self.inner.batch_upload_limit;
        if files.len() > max {
            return Err(UploadError::BatchTooLarge {
                max,
                got: files.len(),
            });
        }

        let mut results = Vec::with_capacity(files.len());
        for file in files {
            results.push(self.upload(file, kind).await);
        }
        Ok(results)
    }

    /// Supply the parent record's identifier. Only the first value is kept.
    pub fn set_parent_id(&self, parent_id: ParentId) {
        let mut state = self.inner.lock();
        if state.closed {
            return;
        }
        if let Some(current) = &state.parent_id {
            if *current != parent_id {
                tracing::warn!(
                    current = %current,
                    ignored = %parent_id,
                    "Parent identifier already set; ignoring new value"
                );
            }
            return;
        }

        tracing::info!(
            parent_id = %parent_id,
            pending_count = state.queue.len(),
            "Parent record identifier known"
        );
        state.parent_id = Some(parent_id);
        self.inner.mark_changed(&mut state);
        self.inner.publish(&mut state);
        self.inner.reconcile(&mut state);
    }

    /// Forget a pending item before it is committed. Never calls the backend.
    pub fn remove_pending(&self, index: usize) -> Option<PendingItem> {
        let mut state = self.inner.lock();
        if state.closed {
            return None;
        }
        let removed = state.queue.remove_at(index)?;
        tracing::debug!(reference = %removed.reference, "Pending item removed by user");
        self.inner.mark_changed(&mut state);
        self.inner.publish(&mut state);
        self.inner.reconcile(&mut state);
        Some(removed)
    }

    /// Manual retry of pending items after a failed commit.
    ///
    /// Returns whether a commit was started; `false` when one is already
    /// outstanding or nothing is pending.
    pub fn retry(&self) -> Result<bool, AttachError> {
        let mut state = self.inner.lock();
        if state.closed {
            return Err(AttachError::SessionClosed);
        }
        if state.parent_id.is_none() {
            return Err(AttachError::ParentUnknown);
        }
        Ok(self.inner.reconcile(&mut state))
    }

    pub fn status(&self) -> StatusTuple {
        self.inner.lock().status.current()
    }

    /// Stream of status transitions, starting with the current tuple.
    /// Ends when the session is closed.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<StatusTuple> {
        let mut state = self.inner.lock();
        let rx = state.status.subscribe();
        if state.closed {
            state.status.close();
        }
        rx
    }

    /// Pending items, newest first.
    pub fn pending(&self) -> Vec<PendingItem> {
        self.inner.lock().queue.peek().to_vec()
    }

    /// Files known to be attached, as last reported by the backend.
    pub fn attached(&self) -> Vec<AttachedFile> {
        self.inner.lock().attached.clone()
    }

    /// Message for the error banner, if the last upload or commit failed.
    pub fn last_error(&self) -> Option<String> {
        self.inner.lock().last_error.clone()
    }

    pub fn clear_error(&self) {
        self.inner.lock().last_error = None;
    }

    pub fn parent_id(&self) -> Option<ParentId> {
        self.inner.lock().parent_id.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Re-read the attached files of the parent record for display.
    pub async fn refresh_attached(&self) -> anyhow::Result<Vec<AttachedFile>> {
        let parent_id = self
            .parent_id()
            .ok_or_else(|| anyhow::anyhow!("Parent record identifier is not known yet"))?;
        let lister = self
            .inner
            .lister
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Session has no list primitive"))?;

        let files = lister.list(&parent_id).await?;
        self.inner.lock().attached = files.clone();
        Ok(files)
    }

    /// Tear the session down. Pending items are discarded and returned; their
    /// durable references stay valid in storage but are no longer attached.
    pub fn close(&self) -> Vec<PendingItem> {
        let mut state = self.inner.lock();
        if state.closed {
            return Vec::new();
        }
        state.closed = true;
        let orphaned = state.queue.drain();
        if !orphaned.is_empty() {
            tracing::warn!(
                orphaned_count = orphaned.len(),
                parent_known = state.parent_id.is_some(),
                "Attachment session closed with unattached uploads"
            );
        } else {
            tracing::debug!("Attachment session closed");
        }
        state.status.close();
        orphaned
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn compute_status(&self, state: &SessionState) -> StatusTuple {
        StatusTuple {
            uploading: state.uploads_in_flight > 0,
            attaching: self.committer.in_flight(),
            pending_count: state.queue.len(),
            has_parent_id: state.parent_id.is_some(),
        }
    }

    fn publish(&self, state: &mut SessionState) {
        let next = self.compute_status(state);
        state.status.publish(next);
    }

    fn mark_changed(&self, state: &mut SessionState) {
        if self.committer.in_flight() {
            state.changed_during_commit = true;
        }
    }

    /// Apply the reconciliation rule. Returns whether a commit was started.
    fn reconcile(self: &Arc<Self>, state: &mut SessionState) -> bool {
        let decision = reconcile::evaluate(
            state.parent_id.as_ref(),
            self.committer.in_flight(),
            state.queue.len(),
            state.closed,
        );
        let parent_id = match decision {
            Decision::Commit(parent_id) => parent_id,
            Decision::Skip(reason) => {
                tracing::trace!(?reason, "Reconciliation skipped");
                return false;
            }
        };
        let Some(permit) = self.committer.try_begin() else {
            return false;
        };

        let snapshot = state.queue.peek().to_vec();
        state.changed_during_commit = false;
        self.publish(state);

        tracing::info!(
            parent_id = %parent_id,
            item_count = snapshot.len(),
            "Committing pending attachments"
        );

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            inner.run_commit(permit, parent_id, snapshot).await;
        });
        true
    }

    async fn run_commit(
        self: Arc<Self>,
        permit: CommitPermit,
        parent_id: ParentId,
        snapshot: Vec<PendingItem>,
    ) {
        let result = self.committer.commit(&permit, &parent_id, &snapshot).await;
        let committed: Vec<PendingItemId> = snapshot.iter().map(|item| item.id).collect();

        let needs_refresh = {
            let mut state = self.lock();
            drop(permit);

            if state.closed {
                tracing::debug!(success = result.is_ok(), "Commit settled after session closed");
                return;
            }

            match result {
                Ok(outcome) => {
                    let drained = state.queue.drain_committed(&committed);
                    tracing::info!(
                        parent_id = %parent_id,
                        attached_count = drained.len(),
                        still_pending = state.queue.len(),
                        "Attachments committed"
                    );
                    state.last_error = None;
                    let needs_refresh = match outcome {
                        AttachOutcome::Files(files) => {
                            state.attached = files;
                            false
                        }
                        AttachOutcome::Acknowledged => true,
                    };
                    self.publish(&mut state);
                    self.reconcile(&mut state);
                    needs_refresh
                }
                Err(e) => {
                    log_error(&e, "Attach failed; items stay pending");
                    state.last_error = Some(e.client_message());
                    self.publish(&mut state);
                    // A failed batch waits for the next append or an explicit retry,
                    // unless something changed while it was in flight.
                    if state.changed_during_commit {
                        self.reconcile(&mut state);
                    }
                    false
                }
            }
        };

        if needs_refresh {
            self.refresh_after_commit(&parent_id).await;
        }
    }

    async fn refresh_after_commit(&self, parent_id: &ParentId) {
        let Some(lister) = &self.lister else {
            return;
        };
        match lister.list(parent_id).await {
            Ok(files) => {
                let mut state = self.lock();
                if !state.closed {
                    state.attached = files;
                }
            }
            Err(e) => {
                tracing::warn!(parent_id = %parent_id, error = %e, "Failed to refresh attached files");
            }
        }
    }
}

/// Keeps `uploads_in_flight` honest even if the upload future is dropped.
struct UploadGuard<'a> {
    inner: &'a Arc<Inner>,
    armed: bool,
}

impl UploadGuard<'_> {
    fn settle(
        mut self,
        result: Result<String, UploadError>,
        display_name: String,
        kind: AssetKind,
    ) -> Result<PendingItemId, UploadError> {
        self.armed = false;
        let inner = self.inner;
        let mut state = inner.lock();
        state.uploads_in_flight = state.uploads_in_flight.saturating_sub(1);

        if state.closed {
            if let Ok(reference) = &result {
                tracing::warn!(reference = %reference, "Upload finished after session closed; reference orphaned");
            }
            return Err(UploadError::SessionClosed);
        }

        match result {
            Ok(reference) => {
                let item = PendingItem::new(reference, display_name, kind);
                let id = item.id;
                tracing::debug!(
                    reference = %item.reference,
                    parent_known = state.parent_id.is_some(),
                    "Upload queued for attachment"
                );
                state.queue.append(item);
                inner.mark_changed(&mut state);
                inner.publish(&mut state);
                inner.reconcile(&mut state);
                Ok(id)
            }
            Err(e) => {
                log_error(&e, "Upload failed");
                state.last_error = Some(e.client_message());
                inner.publish(&mut state);
                Err(e)
            }
        }
    }
}

impl Drop for UploadGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.inner.lock();
            state.uploads_in_flight = state.uploads_in_flight.saturating_sub(1);
            self.inner.publish(&mut state);
        }
    }
}

fn log_error<E>(err: &E, message: &str)
where
    E: std::error::Error + ErrorMetadata,
{
    let code = err.error_code();
    let recoverable = err.is_recoverable();
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(error = %err, code, recoverable, "{}", message),
        LogLevel::Warn => tracing::warn!(error = %err, code, recoverable, "{}", message),
        LogLevel::Error => tracing::error!(error = %err, code, recoverable, "{}", message),
    }
}
