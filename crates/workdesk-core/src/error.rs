//! Error types module
//!
//! The pipeline has two recoverable error families: `UploadError` (nothing was
//! queued) and `AttachError` (the batch stays queued for the next attempt).
//! Both self-describe how they should be presented through `ErrorMetadata`.
//! A watchdog timeout is not an error and has no variant here.

use crate::models::AssetKind;
use crate::validation::ValidationError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like a wrong file for a control
    Debug,
    /// Warning level - for recoverable issues like a failed attach
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to the user.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "UPLOAD_TRANSPORT_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether repeating the action may succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message for the error banner
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Wrong file for the {expected} control: {content_type}")]
    WrongKind {
        expected: AssetKind,
        content_type: String,
    },

    #[error("Invalid file: {0}")]
    Validation(#[from] ValidationError),

    #[error("Upload failed: {message}")]
    Transport {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Upload response did not contain a file reference")]
    MissingReference,

    #[error("Too many files selected: {got} (max: {max})")]
    BatchTooLarge { max: usize, got: usize },

    #[error("Attachment session is closed")]
    SessionClosed,
}

#[derive(Debug, thiserror::Error)]
pub enum AttachError {
    #[error("Attach failed: {message}")]
    Transport {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Attach rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Parent record identifier is not known yet")]
    ParentUnknown,

    #[error("Attachment session is closed")]
    SessionClosed,
}

impl From<anyhow::Error> for UploadError {
    fn from(err: anyhow::Error) -> Self {
        UploadError::Transport {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for AttachError {
    fn from(err: anyhow::Error) -> Self {
        AttachError::Transport {
            message: err.to_string(),
            source: err,
        }
    }
}

impl ErrorMetadata for UploadError {
    fn error_code(&self) -> &'static str {
        match self {
            UploadError::WrongKind { .. } => "UPLOAD_WRONG_KIND",
            UploadError::Validation(_) => "UPLOAD_INVALID_FILE",
            UploadError::Transport { .. } => "UPLOAD_TRANSPORT_ERROR",
            UploadError::MissingReference => "UPLOAD_MISSING_REFERENCE",
            UploadError::BatchTooLarge { .. } => "UPLOAD_BATCH_TOO_LARGE",
            UploadError::SessionClosed => "SESSION_CLOSED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(
            self,
            UploadError::Transport { .. } | UploadError::MissingReference
        )
    }

    fn suggested_action(&self) -> Option<&'static str> {
        match self {
            UploadError::WrongKind { expected, .. } => match expected {
                AssetKind::Photo => Some("Choose an image file or use the document control"),
                AssetKind::Document => Some("Choose a supported document type"),
            },
            UploadError::Validation(_) => Some("Check file size and format"),
            UploadError::Transport { .. } | UploadError::MissingReference => {
                Some("Select the file again to retry")
            }
            UploadError::BatchTooLarge { .. } => Some("Select fewer files at once"),
            UploadError::SessionClosed => None,
        }
    }

    fn client_message(&self) -> String {
        match self {
            UploadError::Transport { .. } => "The file could not be uploaded".to_string(),
            UploadError::MissingReference => {
                "The upload service returned an incomplete response".to_string()
            }
            other => other.to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            UploadError::Transport { .. } | UploadError::MissingReference => LogLevel::Warn,
            _ => LogLevel::Debug,
        }
    }
}

impl ErrorMetadata for AttachError {
    fn error_code(&self) -> &'static str {
        match self {
            AttachError::Transport { .. } => "ATTACH_TRANSPORT_ERROR",
            AttachError::Rejected { .. } => "ATTACH_REJECTED",
            AttachError::ParentUnknown => "ATTACH_PARENT_UNKNOWN",
            AttachError::SessionClosed => "SESSION_CLOSED",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, AttachError::SessionClosed)
    }

    fn suggested_action(&self) -> Option<&'static str> {
        match self {
            AttachError::Transport { .. } => Some("Files stay pending; retry in a moment"),
            AttachError::Rejected { .. } => Some("Files stay pending; check the record and retry"),
            AttachError::ParentUnknown => Some("Save the record first"),
            AttachError::SessionClosed => None,
        }
    }

    fn client_message(&self) -> String {
        match self {
            AttachError::Transport { .. } => {
                "Uploaded files could not be attached yet".to_string()
            }
            AttachError::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            AttachError::Transport { .. } | AttachError::Rejected { .. } => LogLevel::Warn,
            AttachError::ParentUnknown | AttachError::SessionClosed => LogLevel::Debug,
        }
    }
}
