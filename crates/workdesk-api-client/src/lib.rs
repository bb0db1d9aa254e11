//! HTTP client for the workdesk REST backend.
//!
//! Provides a minimal client with configurable auth (Bearer token or X-API-Key)
//! and implementations of the upload, attach and list primitives consumed by
//! the attachment pipeline.

pub mod api;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use workdesk_core::PipelineConfig;

/// Authentication strategy for the API.
#[derive(Clone, Debug)]
pub enum Auth {
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// `X-API-Key: {key}`
    XApiKey(String),
    /// No credentials (session cookies are handled by the host)
    None,
}

/// HTTP client for the workdesk API with configurable auth.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_version: String,
    auth: Auth,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, auth: Auth) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_version: "v1".to_string(),
            auth,
        })
    }

    /// Create a client from pipeline configuration. A bearer token wins over
    /// an API key; with neither the client sends no credentials.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let auth = match (&config.api_token, &config.api_key) {
            (Some(token), _) => Auth::Bearer(token.clone()),
            (None, Some(key)) => Auth::XApiKey(key.clone()),
            (None, None) => Auth::None,
        };
        Ok(Self::new(config.api_url.clone(), auth)?.with_api_version(&config.api_version))
    }

    pub fn with_api_version(mut self, version: &str) -> Self {
        self.api_version = version.trim_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// API version prefix (e.g. "/api/v1").
    pub fn api_prefix(&self) -> String {
        format!("/api/{}", self.api_version)
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Auth::Bearer(token) => request.header("Authorization", format!("Bearer {}", token)),
            Auth::XApiKey(key) => request.header("X-API-Key", key.as_str()),
            Auth::None => request,
        }
    }

    /// Send a request with auth applied. Does not inspect the status.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response> {
        self.apply_auth(request)
            .send()
            .await
            .context("Failed to send request")
    }

    /// GET request. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.build_url(path);
        let response = self.send(self.client.get(&url)).await?;
        let response = ensure_success(response).await?;

        let body: T = response
            .json()
            .await
            .context("Failed to parse response as JSON")?;

        Ok(body)
    }

    /// POST multipart form and deserialize response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T> {
        let url = self.build_url(path);
        let response = self.send(self.client.post(&url).multipart(form)).await?;
        let response = ensure_success(response).await?;

        let body: T = response
            .json()
            .await
            .context("Failed to parse response as JSON")?;

        Ok(body)
    }

    /// Raw client for custom requests.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Turn a non-2xx response into an error carrying status and body text.
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(anyhow::anyhow!(
            "API request failed with status {}: {}",
            status,
            error_text
        ));
    }
    Ok(response)
}

pub use api::RecordAttachments;
