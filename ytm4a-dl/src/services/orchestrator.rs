//! Pipeline Orchestrator
//!
//! Sequences resolver → fetcher/transport → normalizer → artifact store for
//! one run and reports progress on the event bus.
//!
//! # Paths
//! - **Remote** (authoritative): used first whenever a backend is configured
//! - **Local** (degraded): embed title lookup + proxy fetch + pass-through
//!   normalization; used when no backend is configured or it is unreachable
//!
//! A backend that answers with an error is final: its message is surfaced as
//! `RemoteServiceError` and the local path is not tried.
//!
//! # Progress
//! | Step                  | State      | % |
//! |-----------------------|------------|---|
//! | validate + resolve    | RESOLVING  | 10 |
//! | metadata analysis     | FETCHING   | 30 |
//! | media retrieval       | FETCHING   | 40 |
//! | packaging + saving    | CONVERTING | 80 |
//! | file on disk          | COMPLETE   | 100 |
//!
//! Any failure, including a failed save, moves the run to FAILED at 0% and
//! stops it.

use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;
use ytm4a_common::events::{EventBus, PipelineEvent, RunOperation};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::models::{
    AcquisitionPath, AudioArtifact, EditableTrackTags, MediaIdentifier, MediaMetadata,
    PipelineFailure, PipelineResult, PipelineRun, RunState, TARGET_EXTENSION,
};
use crate::services::artifact_store::ArtifactStore;
use crate::services::fallback_transport::{FallbackTransport, HttpRouteClient};
use crate::services::format_normalizer::normalize;
use crate::services::identifier_resolver::resolve;
use crate::services::metadata_fetcher::{HttpEmbedLookup, MetadataFetcher};
use crate::services::remote_pipeline::{HttpRemotePipeline, RemoteError, RemotePipeline};

/// Characters replaced in local file names
const UNSAFE_FILENAME_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Artifact in hand, not yet saved
struct Acquired {
    artifact: AudioArtifact,
    suggested_filename: String,
    via: AcquisitionPath,
}

/// Outcome of one run together with its id
#[derive(Debug, Clone)]
pub struct RunOutcome<T> {
    pub run_id: Uuid,
    pub result: T,
}

/// Replace unsafe characters with `_` and trim surrounding whitespace
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if UNSAFE_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Append `.m4a` unless already present (case-sensitive)
pub fn with_target_extension(name: &str) -> String {
    let suffix = format!(".{}", TARGET_EXTENSION);
    if name.ends_with(&suffix) {
        name.to_string()
    } else {
        format!("{}{}", name, suffix)
    }
}

/// `"{artist} - {title}.m4a"`, sanitized
pub fn local_filename(tags: &EditableTrackTags) -> String {
    with_target_extension(&sanitize_filename(&format!(
        "{} - {}",
        tags.artist, tags.title
    )))
}

/// `"{artist}-{title}.m4a"` exactly as the backend path names it
pub fn remote_filename(tags: &EditableTrackTags) -> String {
    format!("{}-{}.{}", tags.artist, tags.title, TARGET_EXTENSION)
}

/// One run: state machine plus event emission
struct RunTracker {
    run: PipelineRun,
    event_bus: Arc<EventBus>,
}

impl RunTracker {
    fn start(operation: RunOperation, source_url: &str, event_bus: Arc<EventBus>) -> Self {
        let run = PipelineRun::new(operation);
        info!(run_id = %run.run_id, ?operation, url = %source_url, "Pipeline run started");
        event_bus.emit_lossy(PipelineEvent::RunStarted {
            run_id: run.run_id,
            operation,
            source_url: source_url.to_string(),
            timestamp: chrono::Utc::now(),
        });
        Self { run, event_bus }
    }

    fn run_id(&self) -> Uuid {
        self.run.run_id
    }

    fn step(&mut self, state: RunState, percentage: u8, message: &str) {
        match self.run.advance(state, percentage, message) {
            Ok(progress) => {
                info!(
                    run_id = %self.run.run_id,
                    stage = progress.stage.as_str(),
                    percentage = progress.percentage,
                    "{}",
                    message
                );
                self.event_bus.emit_lossy(PipelineEvent::ProgressUpdate {
                    run_id: self.run.run_id,
                    progress,
                    timestamp: chrono::Utc::now(),
                });
            }
            Err(e) => error!(run_id = %self.run.run_id, "{}", e),
        }
    }

    fn complete(&mut self, file_name: Option<String>) {
        self.step(RunState::Complete, 100, "Complete");
        self.event_bus.emit_lossy(PipelineEvent::RunCompleted {
            run_id: self.run.run_id,
            operation: self.run.operation,
            file_name,
            timestamp: chrono::Utc::now(),
        });
    }

    fn fail(&mut self, err: PipelineError) -> PipelineFailure {
        let failure = PipelineFailure::from(err);
        warn!(
            run_id = %self.run.run_id,
            kind = failure.kind.code(),
            "Pipeline run failed: {}",
            failure.detail
        );

        match self.run.fail(failure.detail.clone()) {
            Ok(progress) => {
                self.event_bus.emit_lossy(PipelineEvent::ProgressUpdate {
                    run_id: self.run.run_id,
                    progress,
                    timestamp: chrono::Utc::now(),
                });
                self.event_bus.emit_lossy(PipelineEvent::RunFailed {
                    run_id: self.run.run_id,
                    operation: self.run.operation,
                    kind: failure.kind.code().to_string(),
                    message: failure.detail.clone(),
                    timestamp: chrono::Utc::now(),
                });
            }
            Err(e) => error!(run_id = %self.run.run_id, "{}", e),
        }

        failure
    }
}

/// Acquisition pipeline
pub struct PipelineOrchestrator {
    remote: Option<Arc<dyn RemotePipeline>>,
    fetcher: MetadataFetcher,
    transport: FallbackTransport,
    store: ArtifactStore,
    event_bus: Arc<EventBus>,
}

impl PipelineOrchestrator {
    pub fn new(
        remote: Option<Arc<dyn RemotePipeline>>,
        fetcher: MetadataFetcher,
        transport: FallbackTransport,
        store: ArtifactStore,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            remote,
            fetcher,
            transport,
            store,
            event_bus,
        }
    }

    /// Build with HTTP clients from configuration
    pub fn from_config(config: &PipelineConfig, event_bus: Arc<EventBus>) -> anyhow::Result<Self> {
        let remote = match &config.remote_base_url {
            Some(url) => {
                let client = HttpRemotePipeline::new(url.clone(), config.request_timeout)?;
                Some(Arc::new(client) as Arc<dyn RemotePipeline>)
            }
            None => None,
        };

        let lookup = HttpEmbedLookup::new(config.embed_timeout).map_err(anyhow::Error::msg)?;
        let fetcher = MetadataFetcher::new(Arc::new(lookup), config.embed_timeout);

        let route_client = HttpRouteClient::new(config.request_timeout)?;
        let transport = FallbackTransport::new(config.proxy_routes.clone(), Arc::new(route_client));

        let store = ArtifactStore::new(config.output_folder.clone());

        Ok(Self::new(remote, fetcher, transport, store, event_bus))
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Metadata for the video at `raw_url`
    pub async fn preview(&self, raw_url: &str) -> RunOutcome<Result<MediaMetadata, PipelineFailure>> {
        let mut tracker = RunTracker::start(RunOperation::Preview, raw_url, self.event_bus.clone());
        let result = self.run_preview(&mut tracker, raw_url).await;
        RunOutcome {
            run_id: tracker.run_id(),
            result,
        }
    }

    async fn run_preview(
        &self,
        tracker: &mut RunTracker,
        raw_url: &str,
    ) -> Result<MediaMetadata, PipelineFailure> {
        tracker.step(RunState::Resolving, 10, "Validating URL");
        let id = resolve(raw_url).map_err(|e| tracker.fail(e))?;

        tracker.step(RunState::Fetching, 30, "Analyzing metadata");

        if let Some(remote) = &self.remote {
            match remote.preview(raw_url.trim()).await {
                Ok(metadata) => {
                    tracker.complete(None);
                    return Ok(metadata);
                }
                Err(RemoteError::Service(message)) => {
                    return Err(tracker.fail(PipelineError::RemoteService(message)));
                }
                Err(RemoteError::Unreachable(reason)) => {
                    warn!(%reason, "Backend unreachable, using local metadata lookup");
                }
            }
        }

        let metadata = self.fetcher.fetch_metadata(&id).await;
        tracker.complete(None);
        Ok(metadata)
    }

    /// Download the video at `raw_url` as M4A tagged with `tags` and save it
    /// in the output folder
    pub async fn download(&self, raw_url: &str, tags: &EditableTrackTags) -> RunOutcome<PipelineResult> {
        let mut tracker = RunTracker::start(RunOperation::Download, raw_url, self.event_bus.clone());
        let result = match self.run_download(&mut tracker, raw_url, tags).await {
            Ok(result) => result,
            Err(failure) => PipelineResult::Failure(failure),
        };
        RunOutcome {
            run_id: tracker.run_id(),
            result,
        }
    }

    async fn run_download(
        &self,
        tracker: &mut RunTracker,
        raw_url: &str,
        tags: &EditableTrackTags,
    ) -> Result<PipelineResult, PipelineFailure> {
        let Acquired {
            artifact,
            suggested_filename,
            via,
        } = self.acquire(tracker, raw_url, tags).await?;

        let saved = self
            .store
            .save(&artifact, &suggested_filename, via, tags)
            .await
            .map_err(|e| tracker.fail(PipelineError::Storage(e.to_string())))?;
        tracker.complete(Some(saved.file_name.clone()));

        Ok(PipelineResult::Success {
            artifact,
            suggested_filename,
            via,
            saved,
        })
    }

    async fn acquire(
        &self,
        tracker: &mut RunTracker,
        raw_url: &str,
        tags: &EditableTrackTags,
    ) -> Result<Acquired, PipelineFailure> {
        tags.validate().map_err(|e| tracker.fail(e))?;

        tracker.step(RunState::Resolving, 10, "Validating URL");
        let id = resolve(raw_url).map_err(|e| tracker.fail(e))?;

        if let Some(remote) = &self.remote {
            tracker.step(RunState::Fetching, 40, "Downloading on server");
            match remote.download_with_metadata(raw_url.trim(), tags).await {
                Ok(bytes) => {
                    tracker.step(RunState::Converting, 80, "Packaging audio");
                    return Ok(Acquired {
                        artifact: normalize(bytes),
                        suggested_filename: remote_filename(tags),
                        via: AcquisitionPath::Remote,
                    });
                }
                Err(RemoteError::Service(message)) => {
                    return Err(tracker.fail(PipelineError::RemoteService(message)));
                }
                Err(RemoteError::Unreachable(reason)) => {
                    warn!(%reason, "Backend unreachable, using degraded local download");
                }
            }
        }

        self.local_download(tracker, &id, tags).await
    }

    async fn local_download(
        &self,
        tracker: &mut RunTracker,
        id: &MediaIdentifier,
        tags: &EditableTrackTags,
    ) -> Result<Acquired, PipelineFailure> {
        tracker.step(RunState::Fetching, 30, "Analyzing metadata");
        let metadata = self.fetcher.fetch_metadata(id).await;
        if metadata.degraded {
            info!(id = %id, "Continuing with placeholder metadata");
        }

        tracker.step(RunState::Fetching, 40, "Retrieving audio");
        let bytes = self
            .transport
            .fetch_media(id)
            .await
            .map_err(|e| tracker.fail(e))?;

        tracker.step(RunState::Converting, 80, "Converting to M4A");
        Ok(Acquired {
            artifact: normalize(bytes),
            suggested_filename: local_filename(tags),
            via: AcquisitionPath::Local,
        })
    }
}
