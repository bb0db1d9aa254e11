//! Test helpers: fake primitives and session builders for integration tests.
//!
//! Run from workspace root: `cargo test -p workdesk-attachments`.
//! Timing-sensitive tests use a paused clock (`start_paused = true`).

#![allow(dead_code)]

pub mod fakes;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use workdesk_attachments::{AssetUploader, AttachmentCommitter, AttachmentSession, StatusTuple};
use workdesk_core::{AssetFile, PipelineConfig};

use fakes::{FakeAttacher, FakeLister, FakeUploader};

pub fn photo(name: &str) -> AssetFile {
    AssetFile::new(name, "image/jpeg", Bytes::from_static(b"\xff\xd8\xff\xe0jpeg"))
}

pub fn document(name: &str) -> AssetFile {
    AssetFile::new(name, "application/pdf", Bytes::from_static(b"%PDF-1.7"))
}

pub fn config() -> PipelineConfig {
    PipelineConfig::default()
}

pub fn session(uploader: &Arc<FakeUploader>, attacher: &Arc<FakeAttacher>) -> AttachmentSession {
    let config = config();
    AttachmentSession::new(
        AssetUploader::new(uploader.clone(), &config),
        AttachmentCommitter::new(attacher.clone()),
        &config,
    )
}

pub fn session_with_lister(
    uploader: &Arc<FakeUploader>,
    attacher: &Arc<FakeAttacher>,
    lister: &Arc<FakeLister>,
) -> AttachmentSession {
    let config = config();
    AttachmentSession::with_lister(
        AssetUploader::new(uploader.clone(), &config),
        AttachmentCommitter::new(attacher.clone()),
        lister.clone(),
        &config,
    )
}

/// Let every spawned task run until it blocks. With a paused clock the
/// runtime only advances time once all tasks are idle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

pub fn tuple(uploading: bool, attaching: bool, pending_count: usize, has_parent_id: bool) -> StatusTuple {
    StatusTuple {
        uploading,
        attaching,
        pending_count,
        has_parent_id,
    }
}

/// Everything already delivered to a status subscriber.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<StatusTuple>) -> Vec<StatusTuple> {
    let mut seen = Vec::new();
    while let Ok(status) = rx.try_recv() {
        seen.push(status);
    }
    seen
}
