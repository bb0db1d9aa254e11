//! Workdesk Core Library
//!
//! Domain models, error types, configuration, client-side validation and the
//! external primitive traits shared by the attachment pipeline, the HTTP client
//! and the CLI.

pub mod config;
pub mod error;
pub mod models;
pub mod primitives;
pub mod validation;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use error::{AttachError, ErrorMetadata, LogLevel, UploadError};
pub use models::{
    AssetFile, AssetKind, AttachOutcome, AttachedFile, AttachmentRequest, ParentId, PendingItem,
    PendingItemId, StatusTuple,
};
pub use primitives::{AttachPrimitive, ListPrimitive, UploadPrimitive};
pub use validation::{AssetValidator, ValidationError};
