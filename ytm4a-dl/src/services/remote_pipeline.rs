//! Remote Pipeline client
//!
//! Typed client for the authoritative backend:
//! - `POST /preview` `{url}` → JSON metadata envelope
//! - `POST /download-with-metadata` `{url, title, artist}` → tagged M4A bytes,
//!   or a JSON `{success: false, message}` envelope (told apart by content type)
//!
//! Failures are split by whether the backend was reached at all. Only an
//! unreachable backend lets the caller fall back to the local path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{EditableTrackTags, MediaMetadata, UNKNOWN_ARTIST};

const USER_AGENT: &str = concat!("ytm4a/", env!("CARGO_PKG_VERSION"));

/// Remote client errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// No response received (connect failure, timeout)
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    /// Backend answered with an error; message is shown to the user verbatim
    #[error("{0}")]
    Service(String),
}

#[derive(Debug, Serialize)]
struct PreviewRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Serialize)]
struct DownloadRequest<'a> {
    url: &'a str,
    title: &'a str,
    artist: &'a str,
}

/// `/preview` response envelope
#[derive(Debug, Deserialize)]
struct PreviewResponse {
    success: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    duration: u64,
    #[serde(default)]
    uploader: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnail: String,
}

/// Failure envelope of `/download-with-metadata`
#[derive(Debug, Deserialize)]
struct FailureResponse {
    #[serde(default)]
    message: String,
}

impl PreviewResponse {
    fn into_metadata(self, source_url: &str) -> MediaMetadata {
        let author = [self.artist.trim(), self.uploader.trim()]
            .into_iter()
            .find(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_ARTIST)
            .to_string();

        MediaMetadata {
            title: self.title,
            author,
            duration_seconds: self.duration,
            thumbnail_url: self.thumbnail,
            source_url: source_url.to_string(),
            uploader: self.uploader,
            description: self.description,
            degraded: false,
        }
    }
}

/// Authoritative backend operations
#[async_trait]
pub trait RemotePipeline: Send + Sync {
    async fn preview(&self, source_url: &str) -> Result<MediaMetadata, RemoteError>;

    /// Tagged audio bytes for `source_url`, tags embedded server-side
    async fn download_with_metadata(
        &self,
        source_url: &str,
        tags: &EditableTrackTags,
    ) -> Result<Vec<u8>, RemoteError>;
}

/// `RemotePipeline` over reqwest
pub struct HttpRemotePipeline {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpRemotePipeline {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Service(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, RemoteError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Calling remote pipeline");

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Service(format!(
                "HTTP error! status: {}",
                status.as_u16()
            )));
        }

        Ok(response)
    }
}

/// Errors before any response count as unreachable
fn classify(err: reqwest::Error) -> RemoteError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        RemoteError::Unreachable(err.to_string())
    } else {
        RemoteError::Service(err.to_string())
    }
}

#[async_trait]
impl RemotePipeline for HttpRemotePipeline {
    async fn preview(&self, source_url: &str) -> Result<MediaMetadata, RemoteError> {
        let response = self
            .post("/preview", &PreviewRequest { url: source_url })
            .await?;

        let envelope: PreviewResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Service(format!("Unreadable preview response: {}", e)))?;

        if !envelope.success {
            let message = if envelope.message.is_empty() {
                "Preview failed".to_string()
            } else {
                envelope.message
            };
            return Err(RemoteError::Service(message));
        }

        let metadata = envelope.into_metadata(source_url);
        info!(title = %metadata.title, author = %metadata.author, "Remote preview complete");
        Ok(metadata)
    }

    async fn download_with_metadata(
        &self,
        source_url: &str,
        tags: &EditableTrackTags,
    ) -> Result<Vec<u8>, RemoteError> {
        let request = DownloadRequest {
            url: source_url,
            title: &tags.title,
            artist: &tags.artist,
        };
        let response = self.post("/download-with-metadata", &request).await?;

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("application/json"))
            .unwrap_or(false);

        if is_json {
            let failure: FailureResponse = response
                .json()
                .await
                .map_err(|e| RemoteError::Service(format!("Unreadable download response: {}", e)))?;
            let message = if failure.message.is_empty() {
                "Download failed".to_string()
            } else {
                failure.message
            };
            return Err(RemoteError::Service(message));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemoteError::Service(e.to_string()))?;

        info!(bytes = bytes.len(), "Remote download complete");
        Ok(bytes.to_vec())
    }
}
