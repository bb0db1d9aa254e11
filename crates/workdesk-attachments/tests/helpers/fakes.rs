//! Scripted in-memory primitives.
//!
//! Each fake records every call and can be gated with a semaphore so a test
//! decides exactly when an outstanding call settles.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use workdesk_attachments::{Navigator, RedirectReason};
use workdesk_core::{
    AssetFile, AttachError, AttachOutcome, AttachPrimitive, AttachedFile, AttachmentRequest,
    ListPrimitive, ParentId, UploadPrimitive,
};

/// Open gates hand out this many permits.
const OPEN: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Started(String),
    Finished(String),
}

/// Tracks how many calls overlap.
#[derive(Default)]
struct Concurrency {
    active: AtomicUsize,
    max: AtomicUsize,
}

impl Concurrency {
    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct FakeUploader {
    script: Mutex<VecDeque<anyhow::Result<Value>>>,
    gate: Semaphore,
    calls: Mutex<Vec<Call>>,
    concurrency: Concurrency,
}

impl FakeUploader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::with_permits(OPEN))
    }

    /// Every upload blocks until [`FakeUploader::release`] is called.
    pub fn gated() -> Arc<Self> {
        Arc::new(Self::with_permits(0))
    }

    fn with_permits(permits: usize) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            gate: Semaphore::new(permits),
            calls: Mutex::new(Vec::new()),
            concurrency: Concurrency::default(),
        }
    }

    /// Queue the response of the next call. Unscripted calls succeed with a
    /// `url` derived from the file name.
    pub fn push_response(&self, response: anyhow::Result<Value>) {
        self.script.lock().unwrap().push_back(response);
    }

    pub fn release(&self, calls: usize) {
        self.gate.add_permits(calls);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Started(_)))
            .count()
    }

    pub fn max_concurrency(&self) -> usize {
        self.concurrency.max.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UploadPrimitive for FakeUploader {
    async fn upload(&self, file: &AssetFile) -> anyhow::Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Started(file.file_name.clone()));
        self.concurrency.enter();

        self.gate.acquire().await?.forget();
        // Leave room for anything that would wrongly overlap this call.
        tokio::time::sleep(Duration::from_millis(5)).await;

        let response = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({ "Url": format!("https://files.test/{}", file.file_name) })));

        self.concurrency.leave();
        self.calls
            .lock()
            .unwrap()
            .push(Call::Finished(file.file_name.clone()));
        response
    }
}

pub struct FakeAttacher {
    script: Mutex<VecDeque<Result<AttachOutcome, AttachError>>>,
    gate: Semaphore,
    batches: Mutex<Vec<(ParentId, Vec<AttachmentRequest>)>>,
    concurrency: Concurrency,
}

impl FakeAttacher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::with_permits(OPEN))
    }

    pub fn gated() -> Arc<Self> {
        Arc::new(Self::with_permits(0))
    }

    fn with_permits(permits: usize) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            gate: Semaphore::new(permits),
            batches: Mutex::new(Vec::new()),
            concurrency: Concurrency::default(),
        }
    }

    /// Queue the result of the next call. Unscripted calls echo the batch
    /// back as attached files.
    pub fn push_result(&self, result: Result<AttachOutcome, AttachError>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn fail_next(&self, message: &str) {
        self.push_result(Err(AttachError::Transport {
            message: message.to_string(),
            source: anyhow::anyhow!("connection reset"),
        }));
    }

    pub fn release(&self, calls: usize) {
        self.gate.add_permits(calls);
    }

    pub fn batches(&self) -> Vec<(ParentId, Vec<AttachmentRequest>)> {
        self.batches.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    pub fn max_concurrency(&self) -> usize {
        self.concurrency.max.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AttachPrimitive for FakeAttacher {
    async fn attach(
        &self,
        parent_id: &ParentId,
        items: &[AttachmentRequest],
    ) -> Result<AttachOutcome, AttachError> {
        self.batches
            .lock()
            .unwrap()
            .push((parent_id.clone(), items.to_vec()));
        self.concurrency.enter();

        let gated = self.gate.acquire().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.concurrency.leave();
        if let Ok(permit) = gated {
            permit.forget();
        }

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(AttachOutcome::Files(echo(items))))
    }
}

pub fn echo(items: &[AttachmentRequest]) -> Vec<AttachedFile> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| AttachedFile {
            id: Some(i.to_string()),
            reference: item.reference.clone(),
            display_name: item.display_name.clone(),
            kind: item.kind,
            attached_at: None,
        })
        .collect()
}

#[derive(Default)]
pub struct FakeLister {
    files: Mutex<Vec<AttachedFile>>,
    calls: AtomicUsize,
}

impl FakeLister {
    pub fn with_files(files: Vec<AttachedFile>) -> Arc<Self> {
        Arc::new(Self {
            files: Mutex::new(files),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListPrimitive for FakeLister {
    async fn list(&self, _parent_id: &ParentId) -> anyhow::Result<Vec<AttachedFile>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.files.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    navigations: Mutex<Vec<(RedirectReason, Instant)>>,
}

impl RecordingNavigator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reasons(&self) -> Vec<RedirectReason> {
        self.navigations
            .lock()
            .unwrap()
            .iter()
            .map(|(reason, _)| *reason)
            .collect()
    }

    pub fn fired_at(&self) -> Option<Instant> {
        self.navigations.lock().unwrap().first().map(|(_, at)| *at)
    }
}

#[async_trait]
impl Navigator for RecordingNavigator {
    async fn navigate(&self, reason: RedirectReason) {
        self.navigations
            .lock()
            .unwrap()
            .push((reason, Instant::now()));
    }
}
