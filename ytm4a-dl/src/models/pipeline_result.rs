//! Pipeline results and failures

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::error::{ErrorKind, PipelineError};

/// Media type every artifact is labeled with
pub const TARGET_MEDIA_TYPE: &str = "audio/mp4";

/// Extension of the saved file
pub const TARGET_EXTENSION: &str = "m4a";

/// Audio payload ready to be saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    pub bytes: Vec<u8>,
    /// Declared type; always `audio/mp4`
    pub media_type: String,
    /// Type sniffed from the payload, for diagnostics only
    pub detected_type: Option<String>,
    /// `false` when the bytes were passed through unchanged
    pub transcoded: bool,
}

/// Which path produced the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcquisitionPath {
    /// Authoritative backend; tags already embedded
    Remote,
    /// Degraded client-side pipeline
    Local,
}

/// Where and how an artifact was saved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedArtifact {
    pub file_name: String,
    pub file_path: PathBuf,
    pub bytes: usize,
    pub media_type: String,
    pub via: AcquisitionPath,
    /// Tags were written into the file by this process
    pub tagged: bool,
}

/// Terminal error of a run: one message plus a machine-readable kind
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{detail}")]
pub struct PipelineFailure {
    pub kind: ErrorKind,
    pub detail: String,
}

impl From<PipelineError> for PipelineFailure {
    fn from(err: PipelineError) -> Self {
        Self {
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

/// Outcome of a download run
///
/// `Success` is only produced once the file is on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineResult {
    Success {
        artifact: AudioArtifact,
        suggested_filename: String,
        via: AcquisitionPath,
        saved: SavedArtifact,
    },
    Failure(PipelineFailure),
}

impl PipelineResult {
    pub fn failure(&self) -> Option<&PipelineFailure> {
        match self {
            PipelineResult::Failure(failure) => Some(failure),
            PipelineResult::Success { .. } => None,
        }
    }
}
