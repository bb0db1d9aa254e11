//! External primitives consumed by the attachment pipeline.
//!
//! The REST client implements these against the backend; tests substitute
//! in-memory fakes. Implementations must be safe to call from any task.

use async_trait::async_trait;

use crate::error::AttachError;
use crate::models::{AssetFile, AttachOutcome, AttachedFile, AttachmentRequest, ParentId};

/// "Upload one file, get back a durable reference."
///
/// Returns the raw response object. The reference field is extracted by the
/// caller so that a response without one can be reported precisely.
#[async_trait]
pub trait UploadPrimitive: Send + Sync {
    async fn upload(&self, file: &AssetFile) -> anyhow::Result<serde_json::Value>;
}

/// "Attach N references to a parent record" in one batched request.
#[async_trait]
pub trait AttachPrimitive: Send + Sync {
    async fn attach(
        &self,
        parent_id: &ParentId,
        items: &[AttachmentRequest],
    ) -> Result<AttachOutcome, AttachError>;
}

/// Current attached files of a parent record, for display only.
#[async_trait]
pub trait ListPrimitive: Send + Sync {
    async fn list(&self, parent_id: &ParentId) -> anyhow::Result<Vec<AttachedFile>>;
}
