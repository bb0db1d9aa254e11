use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Which upload control an asset came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Photo,
    #[default]
    Document,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Photo => "photo",
            AssetKind::Document => "document",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "photo" | "photos" | "image" => Ok(AssetKind::Photo),
            "document" | "documents" | "doc" => Ok(AssetKind::Document),
            other => Err(format!("Unknown asset kind: {}", other)),
        }
    }
}

/// Local identity of a pending item. Never sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingItemId(pub Uuid);

impl PendingItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PendingItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PendingItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An uploaded asset whose durable reference is not yet attached to a parent record.
///
/// Immutable once created. Lives only in process memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingItem {
    pub id: PendingItemId,
    pub reference: String,
    pub display_name: String,
    pub kind: AssetKind,
    pub created_at: DateTime<Utc>,
}

impl PendingItem {
    pub fn new(reference: String, display_name: String, kind: AssetKind) -> Self {
        Self {
            id: PendingItemId::new(),
            reference,
            display_name,
            kind,
            created_at: Utc::now(),
        }
    }

    pub fn to_request(&self) -> AttachmentRequest {
        AttachmentRequest {
            reference: self.reference.clone(),
            display_name: self.display_name.clone(),
            kind: self.kind,
        }
    }
}

/// Identifier of the parent business record (work order, purchase request).
///
/// Owned by the record-creation workflow; the pipeline only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParentId {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for ParentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentId::Numeric(id) => write!(f, "{}", id),
            ParentId::Text(id) => f.write_str(id),
        }
    }
}

impl FromStr for ParentId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.parse::<i64>() {
            Ok(n) => ParentId::Numeric(n),
            Err(_) => ParentId::Text(trimmed.to_string()),
        })
    }
}

impl From<i64> for ParentId {
    fn from(id: i64) -> Self {
        ParentId::Numeric(id)
    }
}

impl From<&str> for ParentId {
    fn from(id: &str) -> Self {
        ParentId::Text(id.to_string())
    }
}

/// One `{ reference, displayName, kind }` triple of the batched attach body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRequest {
    pub reference: String,
    pub display_name: String,
    pub kind: AssetKind,
}

/// A file already attached to a parent record, as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedFile {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(alias = "url", alias = "Url", alias = "URL", alias = "Reference")]
    pub reference: String,
    #[serde(
        default,
        alias = "DisplayName",
        alias = "name",
        alias = "fileName",
        alias = "FileName"
    )]
    pub display_name: String,
    #[serde(default, alias = "Kind")]
    pub kind: AssetKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_at: Option<DateTime<Utc>>,
}

/// Backend ids arrive as numbers or strings depending on the record type.
fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Result of a successful attach call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachOutcome {
    /// The backend echoed the updated list of attached files.
    Files(Vec<AttachedFile>),
    /// Opaque success acknowledgement.
    Acknowledged,
}

/// A file selected by the user, ready for upload.
#[derive(Debug, Clone)]
pub struct AssetFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl AssetFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}
