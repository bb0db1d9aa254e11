use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use workdesk_api_client::ApiClient;
use workdesk_attachments::{
    AssetUploader, AttachmentCommitter, AttachmentSession, Navigator, RedirectReason, StatusTuple,
};
use workdesk_core::validation::content_type_for_path;
use workdesk_core::{
    AssetFile, AttachedFile, ErrorMetadata, ParentId, PendingItem, PipelineConfig,
};

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Read a file from disk as an upload candidate, guessing its content type
/// from the extension.
pub async fn load_asset(path: &Path) -> anyhow::Result<AssetFile> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid file name: {}", path.display()))?;

    Ok(AssetFile::new(
        file_name,
        content_type_for_path(path),
        Bytes::from(data),
    ))
}

/// Session wired to the REST backend for one record type.
pub fn build_session(
    client: &ApiClient,
    record_path: &str,
    config: &PipelineConfig,
) -> AttachmentSession {
    let attachments = Arc::new(client.records(record_path));
    AttachmentSession::with_lister(
        AssetUploader::new(Arc::new(client.clone()), config),
        AttachmentCommitter::new(attachments.clone()),
        attachments,
        config,
    )
}

/// Wait until no upload or commit is outstanding. Pending items may remain
/// if a commit failed.
///
/// When everything was committed the attached-file list is re-read, so an
/// acknowledgement without an echoed list is reflected before reporting.
pub async fn wait_until_settled(session: &AttachmentSession) -> StatusTuple {
    let mut rx = session.subscribe();
    let mut last = session.status();
    while let Some(status) = rx.recv().await {
        last = status;
        if !status.uploading && !status.attaching {
            break;
        }
    }

    if last.has_parent_id && last.pending_count == 0 {
        if let Err(e) = session.refresh_attached().await {
            tracing::warn!(error = %e, "Failed to refresh attached files");
        }
    }
    last
}

/// One line per failed upload, with the suggested follow-up when there is one.
pub fn describe_failure(label: &str, err: &impl ErrorMetadata) -> String {
    match err.suggested_action() {
        Some(action) => format!("{}: {}. {}", label, err.client_message(), action),
        None => format!("{}: {}", label, err.client_message()),
    }
}

/// Stands in for the record view the host would open after a save.
pub struct LogNavigator {
    destination: String,
    reason: Mutex<Option<RedirectReason>>,
}

impl LogNavigator {
    pub fn new(record_path: &str, parent_id: &ParentId) -> Self {
        Self {
            destination: format!("/{}/{}", record_path.trim_matches('/'), parent_id),
            reason: Mutex::new(None),
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn reason(&self) -> Option<RedirectReason> {
        *self
            .reason
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl Navigator for LogNavigator {
    async fn navigate(&self, reason: RedirectReason) {
        tracing::info!(destination = %self.destination, reason = %reason, "Redirecting");
        *self
            .reason
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(reason);
    }
}

/// JSON summary printed at the end of a command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub parent_id: Option<ParentId>,
    pub status: StatusTuple,
    pub attached: Vec<AttachedFile>,
    pub pending: Vec<PendingItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<RedirectReason>,
}

impl SessionReport {
    pub fn from_session(session: &AttachmentSession, errors: Vec<String>) -> Self {
        Self {
            parent_id: session.parent_id(),
            status: session.status(),
            attached: session.attached(),
            pending: session.pending(),
            errors,
            redirect: None,
        }
    }

    pub fn with_redirect(mut self, redirect: Option<RedirectReason>) -> Self {
        self.redirect = redirect;
        self
    }
}
