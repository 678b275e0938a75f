//! Data models for ytm4a-dl
//!
//! - Media types produced by the resolver and fetchers
//! - Per-run pipeline state machine
//! - Pipeline results and failures

pub mod media;
pub mod pipeline_result;
pub mod pipeline_run;

pub use media::{EditableTrackTags, MediaIdentifier, MediaMetadata, UNKNOWN_ARTIST};
pub use pipeline_result::{
    AcquisitionPath, AudioArtifact, PipelineFailure, PipelineResult, SavedArtifact,
    TARGET_EXTENSION, TARGET_MEDIA_TYPE,
};
pub use pipeline_run::{InvalidTransition, PipelineRun, RunState, StateTransition};
