//! Fallback Transport
//!
//! Retrieves the media payload through an ordered list of relay routes.
//! Routes are tried strictly one at a time, in configured order; the first
//! successful response wins and the remaining routes are never contacted.
//! No route is retried within a run.
//!
//! A route succeeds on any 2xx status, whatever the body holds. Deciding
//! whether the payload is usable audio is left to later stages.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::models::MediaIdentifier;

const USER_AGENT: &str = concat!("ytm4a/", env!("CARGO_PKG_VERSION"));

/// One relay route: a URL prefix the percent-encoded watch URL is appended to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRoute {
    name: String,
    prefix: String,
}

impl ProxyRoute {
    pub fn new(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full request URL for the given identifier
    pub fn request_url(&self, id: &MediaIdentifier) -> String {
        format!("{}{}", self.prefix, urlencoding::encode(&id.watch_url()))
    }
}

/// Failure of one route attempt
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    Status(u16),
}

/// Performs a single GET through a route
#[async_trait]
pub trait RouteClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>, RouteError>;
}

/// `RouteClient` over reqwest
pub struct HttpRouteClient {
    http_client: reqwest::Client,
}

impl HttpRouteClient {
    pub fn new(timeout: Duration) -> Result<Self, RouteError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| RouteError::Network(e.to_string()))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl RouteClient for HttpRouteClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, RouteError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| RouteError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RouteError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RouteError::Network(e.to_string()))?;

        Ok(body.to_vec())
    }
}

/// Ordered, sequential route fallback
pub struct FallbackTransport {
    routes: Vec<ProxyRoute>,
    client: Arc<dyn RouteClient>,
}

impl FallbackTransport {
    pub fn new(routes: Vec<ProxyRoute>, client: Arc<dyn RouteClient>) -> Self {
        Self { routes, client }
    }

    /// Fetch the media payload for `id`
    ///
    /// # Errors
    /// `MediaUnavailable` once every route has failed (or none is configured)
    pub async fn fetch_media(&self, id: &MediaIdentifier) -> Result<Vec<u8>, PipelineError> {
        for (index, route) in self.routes.iter().enumerate() {
            let url = route.request_url(id);
            debug!(route = %route.name, attempt = index + 1, url = %url, "Trying proxy route");

            match self.client.get(&url).await {
                Ok(bytes) => {
                    info!(
                        route = %route.name,
                        id = %id,
                        bytes = bytes.len(),
                        "Retrieved media payload"
                    );
                    return Ok(bytes);
                }
                Err(e) => {
                    warn!(route = %route.name, id = %id, error = %e, "Proxy route failed");
                }
            }
        }

        Err(PipelineError::MediaUnavailable {
            attempted: self.routes.len(),
            message: format!(
                "Could not retrieve the audio after trying {} route(s). \
                 YouTube restrictions likely prevent downloading this video.",
                self.routes.len()
            ),
        })
    }
}
