//! Client-side pre-checks for selected files.
//!
//! These run before any network call so a bad selection never reaches the
//! upload primitive.

use crate::config::PipelineConfig;
use crate::error::UploadError;
use crate::models::{AssetFile, AssetKind};
use std::path::Path;

/// File-level validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Empty file")]
    EmptyFile,
}

/// Validator for one upload control.
#[derive(Debug, Clone)]
pub struct AssetValidator {
    kind: AssetKind,
    max_file_size: usize,
    allowed_content_types: Vec<String>,
}

impl AssetValidator {
    pub fn new(kind: AssetKind, max_file_size: usize, allowed_content_types: Vec<String>) -> Self {
        Self {
            kind,
            max_file_size,
            allowed_content_types: allowed_content_types
                .into_iter()
                .map(|ct| ct.trim().to_lowercase())
                .collect(),
        }
    }

    /// Build the validator for `kind` from pipeline configuration.
    pub fn for_kind(kind: AssetKind, config: &PipelineConfig) -> Self {
        match kind {
            AssetKind::Photo => Self::new(
                kind,
                config.max_photo_size_bytes,
                config.photo_allowed_content_types.clone(),
            ),
            AssetKind::Document => Self::new(
                kind,
                config.max_document_size_bytes,
                config.document_allowed_content_types.clone(),
            ),
        }
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    pub fn validate_filename(&self, filename: &str) -> Result<(), ValidationError> {
        let path = Path::new(filename);
        let has_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| !n.trim().is_empty())
            .unwrap_or(false);
        if !has_name
            || path
                .components()
                .any(|c| c == std::path::Component::ParentDir)
        {
            return Err(ValidationError::InvalidFilename(filename.to_string()));
        }
        Ok(())
    }

    /// An empty allow-list accepts any content type for the control.
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        if self.allowed_content_types.is_empty() {
            return Ok(());
        }

        let normalized = normalize_content_type(content_type);
        if !self.allowed_content_types.iter().any(|ct| ct == &normalized) {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }

    /// Full pre-check. The photo control only ever accepts `image/*`.
    pub fn validate(&self, file: &AssetFile) -> Result<(), UploadError> {
        if self.kind == AssetKind::Photo && !is_image(&file.content_type) {
            return Err(UploadError::WrongKind {
                expected: AssetKind::Photo,
                content_type: file.content_type.clone(),
            });
        }

        self.validate_filename(&file.file_name)?;
        self.validate_file_size(file.size())?;
        self.validate_content_type(&file.content_type)?;
        Ok(())
    }
}

/// Lowercase and strip parameters (`image/JPEG; q=1` -> `image/jpeg`).
fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

fn is_image(content_type: &str) -> bool {
    normalize_content_type(content_type).starts_with("image/")
}

/// Best-effort content type from a file extension, for hosts that only have a path.
pub fn content_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "bmp" => "image/bmp",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "txt" => "text/plain",
        "csv" => "text/csv",
        _ => "application/octet-stream",
    }
}
