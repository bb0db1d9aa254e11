//! Primitive implementations for the workdesk API client.
//!
//! Uploads go to the shared file endpoint; attach and list are scoped to a
//! record type (`work-orders`, `purchase-requests`, ...) by [`RecordAttachments`].

use crate::{ensure_success, ApiClient};
use anyhow::Context;
use async_trait::async_trait;
use workdesk_core::{
    AssetFile, AttachError, AttachOutcome, AttachPrimitive, AttachedFile, AttachmentRequest,
    ListPrimitive, ParentId, UploadPrimitive,
};

#[async_trait]
impl UploadPrimitive for ApiClient {
    #[tracing::instrument(skip(self, file), fields(file_name = %file.file_name, size = file.size()))]
    async fn upload(&self, file: &AssetFile) -> anyhow::Result<serde_json::Value> {
        let part = reqwest::multipart::Part::bytes(file.data.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .with_context(|| format!("Invalid content type: {}", file.content_type))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        self.post_multipart(&format!("{}/files", self.api_prefix()), form)
            .await
    }
}

/// Attach/list endpoints of one parent record type.
#[derive(Clone, Debug)]
pub struct RecordAttachments {
    client: ApiClient,
    record_path: String,
}

impl RecordAttachments {
    pub fn new(client: ApiClient, record_path: impl Into<String>) -> Self {
        Self {
            client,
            record_path: record_path.into().trim_matches('/').to_string(),
        }
    }

    pub fn attachments_path(&self, parent_id: &ParentId) -> String {
        format!(
            "{}/{}/{}/attachments",
            self.client.api_prefix(),
            self.record_path,
            urlencoding::encode(&parent_id.to_string())
        )
    }
}

impl ApiClient {
    /// Attach/list primitives for a record type, e.g. `client.records("work-orders")`.
    pub fn records(&self, record_path: impl Into<String>) -> RecordAttachments {
        RecordAttachments::new(self.clone(), record_path)
    }
}

#[async_trait]
impl AttachPrimitive for RecordAttachments {
    #[tracing::instrument(skip(self, items), fields(parent_id = %parent_id, item_count = items.len()))]
    async fn attach(
        &self,
        parent_id: &ParentId,
        items: &[AttachmentRequest],
    ) -> Result<AttachOutcome, AttachError> {
        let url = self.client.build_url(&self.attachments_path(parent_id));
        let response = self
            .client
            .send(self.client.client().post(&url).json(items))
            .await?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(AttachError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&body),
            });
        }

        let response = ensure_success(response).await?;
        let body = response
            .text()
            .await
            .context("Failed to read attach response")?;

        Ok(parse_attach_body(&body))
    }
}

#[async_trait]
impl ListPrimitive for RecordAttachments {
    #[tracing::instrument(skip(self), fields(parent_id = %parent_id))]
    async fn list(&self, parent_id: &ParentId) -> anyhow::Result<Vec<AttachedFile>> {
        self.client.get(&self.attachments_path(parent_id)).await
    }
}

/// An echoed array of files becomes `Files`; anything else is an acknowledgement.
fn parse_attach_body(body: &str) -> AttachOutcome {
    if body.trim().is_empty() {
        return AttachOutcome::Acknowledged;
    }

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value @ serde_json::Value::Array(_)) => {
            match serde_json::from_value::<Vec<AttachedFile>>(value) {
                Ok(files) => AttachOutcome::Files(files),
                Err(e) => {
                    tracing::debug!(error = %e, "Attach response array not recognised as files");
                    AttachOutcome::Acknowledged
                }
            }
        }
        _ => AttachOutcome::Acknowledged,
    }
}

/// Prefer a `message`/`error` field from a JSON error body over the raw text.
fn rejection_message(body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error", "title"] {
            if let Some(serde_json::Value::String(msg)) = map.get(key) {
                return msg.clone();
            }
        }
    }
    if body.trim().is_empty() {
        "Attach request was rejected".to_string()
    } else {
        body.trim().to_string()
    }
}
