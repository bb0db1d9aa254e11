//! Asset uploader: client-side pre-check plus exactly one call to the upload primitive.

use std::sync::Arc;

use workdesk_core::{
    AssetFile, AssetKind, AssetValidator, ErrorMetadata, PipelineConfig, UploadError,
    UploadPrimitive,
};

/// Wraps the external upload primitive. No retries; the caller decides.
#[derive(Clone)]
pub struct AssetUploader {
    primitive: Arc<dyn UploadPrimitive>,
    photo: AssetValidator,
    document: AssetValidator,
}

impl AssetUploader {
    pub fn new(primitive: Arc<dyn UploadPrimitive>, config: &PipelineConfig) -> Self {
        Self {
            primitive,
            photo: AssetValidator::for_kind(AssetKind::Photo, config),
            document: AssetValidator::for_kind(AssetKind::Document, config),
        }
    }

    fn validator(&self, kind: AssetKind) -> &AssetValidator {
        match kind {
            AssetKind::Photo => &self.photo,
            AssetKind::Document => &self.document,
        }
    }

    /// Upload `file` through the control for `kind` and return its durable reference.
    #[tracing::instrument(skip(self, file), fields(file_name = %file.file_name, kind = %kind))]
    pub async fn upload(&self, file: &AssetFile, kind: AssetKind) -> Result<String, UploadError> {
        self.validator(kind).validate(file).inspect_err(|e| {
            tracing::debug!(error = %e, code = e.error_code(), "Upload rejected by pre-check");
        })?;

        let response = self.primitive.upload(file).await.map_err(|e| {
            tracing::warn!(error = %e, "Upload primitive failed");
            UploadError::from(e.context(format!("Failed to upload {}", file.file_name)))
        })?;

        let reference = extract_reference(&response).ok_or_else(|| {
            tracing::warn!(response = %response, "Upload response has no url field");
            UploadError::MissingReference
        })?;

        tracing::debug!(reference = %reference, "Upload completed");
        Ok(reference)
    }
}

/// Find the `url` field of an upload response, matching the key case-insensitively.
pub fn extract_reference(response: &serde_json::Value) -> Option<String> {
    response
        .as_object()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("url"))
        .and_then(|(_, value)| value.as_str())
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}
