//! Error types for ytm4a-dl
//!
//! Two layers:
//! - `PipelineError`: what a pipeline stage can fail with, collapsed into a
//!   machine-readable `ErrorKind` plus one user-facing message
//! - `ApiError`: HTTP mapping for the local service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::models::PipelineFailure;

/// Machine-distinguishable failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// URL is not a recognized single-video source URL
    InvalidSource,
    /// URL denotes a playlist
    UnsupportedCollection,
    /// Every fallback route failed
    MediaUnavailable,
    /// Backend answered with an error or an unreadable response
    RemoteServiceError,
    /// Edited title/artist missing
    ValidationError,
    /// A run is already in flight for this session
    RunInProgress,
    /// The finished artifact could not be written to the output folder
    StorageError,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidSource => "INVALID_SOURCE",
            ErrorKind::UnsupportedCollection => "UNSUPPORTED_COLLECTION",
            ErrorKind::MediaUnavailable => "MEDIA_UNAVAILABLE",
            ErrorKind::RemoteServiceError => "REMOTE_SERVICE_ERROR",
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::RunInProgress => "RUN_IN_PROGRESS",
            ErrorKind::StorageError => "STORAGE_ERROR",
        }
    }
}

/// Pipeline failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Not a valid YouTube video URL: {0}")]
    InvalidSource(String),

    #[error("Playlists are not supported. Enter the URL of a single video.")]
    UnsupportedCollection,

    #[error("{message}")]
    MediaUnavailable {
        /// Number of routes that were tried
        attempted: usize,
        message: String,
    },

    #[error("{0}")]
    RemoteService(String),

    #[error("{0}")]
    Validation(String),

    #[error("Another preview or download is already running")]
    RunInProgress,

    #[error("Could not save the file: {0}")]
    Storage(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidSource(_) => ErrorKind::InvalidSource,
            PipelineError::UnsupportedCollection => ErrorKind::UnsupportedCollection,
            PipelineError::MediaUnavailable { .. } => ErrorKind::MediaUnavailable,
            PipelineError::RemoteService(_) => ErrorKind::RemoteServiceError,
            PipelineError::Validation(_) => ErrorKind::ValidationError,
            PipelineError::RunInProgress => ErrorKind::RunInProgress,
            PipelineError::Storage(_) => ErrorKind::StorageError,
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Pipeline run ended in `failed`
    #[error("{0}")]
    Pipeline(#[from] PipelineFailure),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(PipelineFailure::from(err))
    }
}

fn pipeline_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidSource | ErrorKind::UnsupportedCollection | ErrorKind::ValidationError => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::RunInProgress => StatusCode::CONFLICT,
        ErrorKind::MediaUnavailable | ErrorKind::RemoteServiceError => StatusCode::BAD_GATEWAY,
        ErrorKind::StorageError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Pipeline(failure) => (
                pipeline_status(failure.kind),
                failure.kind.code(),
                failure.detail,
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
