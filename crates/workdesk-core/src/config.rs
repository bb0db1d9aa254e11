//! Configuration module
//!
//! Settings for the attachment pipeline and its HTTP client, read from the
//! environment (and an optional `.env` file).

use std::env;
use std::time::Duration;

const API_URL: &str = "http://localhost:3000";
const API_VERSION: &str = "v1";
const REDIRECT_TIMEOUT_SECS: u64 = 10;
const BATCH_UPLOAD_LIMIT: usize = 5;
const MAX_PHOTO_SIZE_MB: usize = 10;
const MAX_DOCUMENT_SIZE_MB: usize = 50;
const PHOTO_CONTENT_TYPES: &str = "image/jpeg,image/png,image/gif,image/webp,image/heic";
const DOCUMENT_CONTENT_TYPES: &str = "application/pdf,application/msword,\
application/vnd.openxmlformats-officedocument.wordprocessingml.document,\
application/vnd.ms-excel,\
application/vnd.openxmlformats-officedocument.spreadsheetml.sheet,\
text/plain,text/csv,image/jpeg,image/png";

/// Attachment pipeline configuration
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    /// Bearer token; takes precedence over `api_key` when both are set.
    pub api_token: Option<String>,
    pub api_version: String,
    /// Upper bound the redirect watchdog waits for attachment work to settle.
    pub redirect_timeout: Duration,
    /// Maximum number of files accepted by one multi-select.
    pub batch_upload_limit: usize,
    pub max_photo_size_bytes: usize,
    pub max_document_size_bytes: usize,
    pub photo_allowed_content_types: Vec<String>,
    pub document_allowed_content_types: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_url: API_URL.to_string(),
            api_key: None,
            api_token: None,
            api_version: API_VERSION.to_string(),
            redirect_timeout: Duration::from_secs(REDIRECT_TIMEOUT_SECS),
            batch_upload_limit: BATCH_UPLOAD_LIMIT,
            max_photo_size_bytes: MAX_PHOTO_SIZE_MB * 1024 * 1024,
            max_document_size_bytes: MAX_DOCUMENT_SIZE_MB * 1024 * 1024,
            photo_allowed_content_types: split_list(PHOTO_CONTENT_TYPES),
            document_allowed_content_types: split_list(DOCUMENT_CONTENT_TYPES),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let api_url = env::var("WORKDESK_API_URL")
            .or_else(|_| env::var("API_URL"))
            .unwrap_or_else(|_| API_URL.to_string());

        let api_key = env::var("WORKDESK_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());

        let api_token = env::var("WORKDESK_API_TOKEN")
            .or_else(|_| env::var("JWT_TOKEN"))
            .or_else(|_| env::var("API_TOKEN"))
            .ok()
            .filter(|t| !t.trim().is_empty());

        let redirect_timeout_secs = env::var("WORKDESK_REDIRECT_TIMEOUT_SECS")
            .unwrap_or_else(|_| REDIRECT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .unwrap_or(REDIRECT_TIMEOUT_SECS);

        let max_photo_size_mb = env::var("WORKDESK_MAX_PHOTO_SIZE_MB")
            .unwrap_or_else(|_| MAX_PHOTO_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_PHOTO_SIZE_MB);

        let max_document_size_mb = env::var("WORKDESK_MAX_DOCUMENT_SIZE_MB")
            .unwrap_or_else(|_| MAX_DOCUMENT_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_DOCUMENT_SIZE_MB);

        let config = Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            api_token,
            api_version: env::var("WORKDESK_API_VERSION")
                .unwrap_or_else(|_| API_VERSION.to_string()),
            redirect_timeout: Duration::from_secs(redirect_timeout_secs),
            batch_upload_limit: env::var("WORKDESK_BATCH_UPLOAD_LIMIT")
                .unwrap_or_else(|_| BATCH_UPLOAD_LIMIT.to_string())
                .parse()
                .unwrap_or(BATCH_UPLOAD_LIMIT),
            max_photo_size_bytes: max_photo_size_mb * 1024 * 1024,
            max_document_size_bytes: max_document_size_mb * 1024 * 1024,
            photo_allowed_content_types: split_list(
                &env::var("WORKDESK_PHOTO_CONTENT_TYPES")
                    .unwrap_or_else(|_| PHOTO_CONTENT_TYPES.to_string()),
            ),
            document_allowed_content_types: split_list(
                &env::var("WORKDESK_DOCUMENT_CONTENT_TYPES")
                    .unwrap_or_else(|_| DOCUMENT_CONTENT_TYPES.to_string()),
            ),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "WORKDESK_API_URL must be an http(s) URL, got '{}'",
                self.api_url
            ));
        }

        if self.redirect_timeout.is_zero() {
            return Err(anyhow::anyhow!(
                "WORKDESK_REDIRECT_TIMEOUT_SECS must be greater than 0"
            ));
        }

        if self.batch_upload_limit == 0 {
            return Err(anyhow::anyhow!(
                "WORKDESK_BATCH_UPLOAD_LIMIT must be at least 1"
            ));
        }

        if self.max_photo_size_bytes == 0 || self.max_document_size_bytes == 0 {
            return Err(anyhow::anyhow!("Maximum file sizes must be greater than 0"));
        }

        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
