//! Pipeline components
//!
//! - `identifier_resolver`: URL → video identifier
//! - `metadata_fetcher`: identifier → title/thumbnail (degrades, never fails)
//! - `fallback_transport`: identifier → media bytes through relay routes
//! - `format_normalizer`: bytes → `audio/mp4` artifact
//! - `remote_pipeline`: authoritative backend client
//! - `orchestrator`: sequences the above for one run
//! - `artifact_store`, `run_gate`: persistence and the one-run-at-a-time rule

pub mod artifact_store;
pub mod fallback_transport;
pub mod format_normalizer;
pub mod identifier_resolver;
pub mod metadata_fetcher;
pub mod orchestrator;
pub mod remote_pipeline;
pub mod run_gate;

pub use artifact_store::ArtifactStore;
pub use fallback_transport::{FallbackTransport, HttpRouteClient, ProxyRoute, RouteClient, RouteError};
pub use format_normalizer::normalize;
pub use identifier_resolver::resolve;
pub use metadata_fetcher::{EmbedLookup, HttpEmbedLookup, MetadataFetcher};
pub use orchestrator::{PipelineOrchestrator, RunOutcome};
pub use remote_pipeline::{HttpRemotePipeline, RemoteError, RemotePipeline};
pub use run_gate::{RunGate, RunPermit};
