//! Metadata Fetcher
//!
//! Reads the title of a video from its embed page. The thumbnail is derived
//! from the identifier, no request needed.
//!
//! Never fails: any error, unreadable page, or a lookup exceeding the embed
//! timeout yields placeholder metadata flagged `degraded`. Timed-out lookups
//! are dropped, which closes their connection.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::{MediaIdentifier, MediaMetadata};

const USER_AGENT: &str = concat!("ytm4a/", env!("CARGO_PKG_VERSION"));

/// Suffix YouTube appends to every page title
const TITLE_SUFFIX: &str = " - YouTube";

/// Source of the human-readable title for an identifier
#[async_trait]
pub trait EmbedLookup: Send + Sync {
    /// `Ok(None)` when the page was read but carried no usable title
    async fn fetch_title(&self, id: &MediaIdentifier) -> Result<Option<String>, String>;
}

/// `EmbedLookup` over reqwest against the embed page
pub struct HttpEmbedLookup {
    http_client: reqwest::Client,
}

impl HttpEmbedLookup {
    pub fn new(timeout: Duration) -> Result<Self, String> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| e.to_string())?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl EmbedLookup for HttpEmbedLookup {
    async fn fetch_title(&self, id: &MediaIdentifier) -> Result<Option<String>, String> {
        let response = self
            .http_client
            .get(id.embed_url())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("embed page returned HTTP {}", status.as_u16()));
        }

        let html = response.text().await.map_err(|e| e.to_string())?;
        Ok(extract_title(&html))
    }
}

/// Title from an HTML document, entities decoded, minus the site suffix
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;
    let text: String = document.select(&selector).next()?.text().collect();
    let trimmed = text.trim();
    let title = trimmed
        .strip_suffix(TITLE_SUFFIX.trim_start())
        .unwrap_or(trimmed)
        .trim()
        .to_string();

    if title.is_empty() || title == "YouTube" {
        None
    } else {
        Some(title)
    }
}

/// Bounded, degrading metadata lookup
pub struct MetadataFetcher {
    lookup: Arc<dyn EmbedLookup>,
    timeout: Duration,
}

impl MetadataFetcher {
    pub fn new(lookup: Arc<dyn EmbedLookup>, timeout: Duration) -> Self {
        Self { lookup, timeout }
    }

    pub async fn fetch_metadata(&self, id: &MediaIdentifier) -> MediaMetadata {
        match tokio::time::timeout(self.timeout, self.lookup.fetch_title(id)).await {
            Ok(Ok(Some(title))) => {
                debug!(id = %id, title = %title, "Read title from embed page");
                MediaMetadata::with_title(id, title)
            }
            Ok(Ok(None)) => {
                warn!(id = %id, "Embed page had no readable title, using placeholder");
                MediaMetadata::placeholder(id)
            }
            Ok(Err(e)) => {
                warn!(id = %id, error = %e, "Embed lookup failed, using placeholder");
                MediaMetadata::placeholder(id)
            }
            Err(_) => {
                warn!(
                    id = %id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Embed lookup timed out, using placeholder"
                );
                MediaMetadata::placeholder(id)
            }
        }
    }
}
