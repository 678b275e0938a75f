//! Test Helper Utilities
//!
//! Scripted stand-ins for every network seam of the pipeline. Each one counts
//! its calls so tests can assert that validation failures never touch the
//! network.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use ytm4a_common::events::{EventBus, PipelineEvent, ProgressEvent};
use ytm4a_dl::models::{EditableTrackTags, MediaIdentifier, MediaMetadata};
use ytm4a_dl::services::{
    ArtifactStore, EmbedLookup, FallbackTransport, MetadataFetcher, PipelineOrchestrator,
    ProxyRoute, RemoteError, RemotePipeline, RouteClient, RouteError,
};

/// Embed lookup returning a fixed answer
pub struct MockEmbed {
    title: Option<String>,
    pub calls: AtomicUsize,
}

impl MockEmbed {
    pub fn titled(title: &str) -> Arc<Self> {
        Arc::new(Self {
            title: Some(title.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Every lookup fails (access restriction)
    pub fn blocked() -> Arc<Self> {
        Arc::new(Self {
            title: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbedLookup for MockEmbed {
    async fn fetch_title(&self, _id: &MediaIdentifier) -> Result<Option<String>, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.title {
            Some(title) => Ok(Some(title.clone())),
            None => Err("blocked by upstream".to_string()),
        }
    }
}

/// Route client succeeding only for one prefix, recording requested URLs
pub struct MockRoutes {
    succeed_prefix: Option<String>,
    payload: Vec<u8>,
    pub requested: Mutex<Vec<String>>,
}

impl MockRoutes {
    pub fn all_failing() -> Arc<Self> {
        Arc::new(Self {
            succeed_prefix: None,
            payload: Vec::new(),
            requested: Mutex::new(Vec::new()),
        })
    }

    pub fn succeeding_at(prefix: &str, payload: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            succeed_prefix: Some(prefix.to_string()),
            payload: payload.to_vec(),
            requested: Mutex::new(Vec::new()),
        })
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl RouteClient for MockRoutes {
    async fn get(&self, url: &str) -> Result<Vec<u8>, RouteError> {
        self.requested.lock().unwrap().push(url.to_string());
        match &self.succeed_prefix {
            Some(prefix) if url.starts_with(prefix.as_str()) => Ok(self.payload.clone()),
            _ => Err(RouteError::Status(403)),
        }
    }
}

/// How the mock backend answers
#[derive(Clone)]
pub enum RemoteBehavior {
    Ok,
    ServiceError(String),
    Unreachable,
}

/// Backend that tags nothing but records what it was asked for
pub struct MockRemote {
    behavior: RemoteBehavior,
    pub preview_calls: AtomicUsize,
    pub downloads: Mutex<Vec<EditableTrackTags>>,
}

impl MockRemote {
    pub fn new(behavior: RemoteBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            preview_calls: AtomicUsize::new(0),
            downloads: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.preview_calls.load(Ordering::SeqCst) + self.downloads.lock().unwrap().len()
    }

    fn answer<T>(&self, value: T) -> Result<T, RemoteError> {
        match &self.behavior {
            RemoteBehavior::Ok => Ok(value),
            RemoteBehavior::ServiceError(message) => Err(RemoteError::Service(message.clone())),
            RemoteBehavior::Unreachable => {
                Err(RemoteError::Unreachable("connection refused".to_string()))
            }
        }
    }
}

#[async_trait]
impl RemotePipeline for MockRemote {
    async fn preview(&self, source_url: &str) -> Result<MediaMetadata, RemoteError> {
        self.preview_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(MediaMetadata {
            title: "Remote Song".to_string(),
            author: "Remote Band".to_string(),
            duration_seconds: 215,
            thumbnail_url: "https://img.example/thumb.jpg".to_string(),
            source_url: source_url.to_string(),
            uploader: "Remote Band".to_string(),
            description: String::new(),
            degraded: false,
        })
    }

    async fn download_with_metadata(
        &self,
        _source_url: &str,
        tags: &EditableTrackTags,
    ) -> Result<Vec<u8>, RemoteError> {
        self.downloads.lock().unwrap().push(tags.clone());
        self.answer(b"remote-m4a".to_vec())
    }
}

/// The three reference route names with test prefixes
pub fn test_routes() -> Vec<ProxyRoute> {
    vec![
        ProxyRoute::new("first", "http://relay-one.test/"),
        ProxyRoute::new("second", "http://relay-two.test/raw?url="),
        ProxyRoute::new("third", "http://relay-three.test/"),
    ]
}

/// Orchestrator wired to mocks, saving into `output`
pub fn orchestrator(
    remote: Option<Arc<MockRemote>>,
    embed: Arc<MockEmbed>,
    routes: Arc<MockRoutes>,
    event_bus: Arc<EventBus>,
    output: &Path,
) -> PipelineOrchestrator {
    PipelineOrchestrator::new(
        remote.map(|r| r as Arc<dyn RemotePipeline>),
        MetadataFetcher::new(embed, Duration::from_millis(200)),
        FallbackTransport::new(test_routes(), routes),
        ArtifactStore::new(output),
        event_bus,
    )
}

/// Everything already published on the subscription
pub fn drain(rx: &mut broadcast::Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Progress payloads only, in emission order
pub fn progress_of(events: &[PipelineEvent]) -> Vec<ProgressEvent> {
    events
        .iter()
        .filter_map(|event| match event {
            PipelineEvent::ProgressUpdate { progress, .. } => Some(progress.clone()),
            _ => None,
        })
        .collect()
}
