//! Preview and download endpoints
//!
//! Each request holds the run gate for the whole run. The run executes on its
//! own task: if the client disconnects, the handler is dropped but the run
//! (and saving its file) still finishes, then releases the gate.
//!
//! Unreadable request bodies are answered with the usual error envelope
//! (`400 BAD_REQUEST`), never axum's plain-text rejection.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{AcquisitionPath, EditableTrackTags, MediaMetadata, PipelineResult};
use crate::AppState;

/// POST /preview request
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub url: String,
}

/// POST /download request
#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    pub title: String,
    pub artist: String,
}

/// POST /download response
#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub run_id: Uuid,
    pub file_name: String,
    pub file_path: PathBuf,
    pub bytes: usize,
    pub media_type: String,
    pub via: AcquisitionPath,
    pub tagged: bool,
}

fn request_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(request)| request)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// POST /preview
///
/// Returns metadata used to seed the editable title/artist.
pub async fn preview(
    State(state): State<AppState>,
    payload: Result<Json<PreviewRequest>, JsonRejection>,
) -> ApiResult<Json<MediaMetadata>> {
    let request = request_body(payload)?;
    let permit = state.run_gate.try_begin()?;

    let task_state = state.clone();
    let handle = tokio::spawn(async move {
        let _permit = permit;
        let outcome = task_state.orchestrator.preview(&request.url).await;
        if let Err(failure) = &outcome.result {
            task_state.record_error(failure.to_string()).await;
        }
        outcome.result
    });

    let metadata = handle
        .await
        .map_err(|e| ApiError::Internal(format!("Preview task failed: {}", e)))??;

    Ok(Json(metadata))
}

/// POST /download
///
/// Runs the pipeline, which saves the result in the output folder.
pub async fn download(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> ApiResult<Json<DownloadResponse>> {
    let request = request_body(payload)?;
    let permit = state.run_gate.try_begin()?;

    let task_state = state.clone();
    let handle = tokio::spawn(async move {
        let _permit = permit;
        let result = run_download(&task_state, request).await;
        if let Err(e) = &result {
            task_state.record_error(e.to_string()).await;
        }
        result
    });

    let response = handle
        .await
        .map_err(|e| ApiError::Internal(format!("Download task failed: {}", e)))??;

    Ok(Json(response))
}

async fn run_download(state: &AppState, request: DownloadRequest) -> ApiResult<DownloadResponse> {
    let tags = EditableTrackTags::new(request.title, request.artist);
    let outcome = state.orchestrator.download(&request.url, &tags).await;

    match outcome.result {
        PipelineResult::Success { saved, .. } => Ok(DownloadResponse {
            run_id: outcome.run_id,
            file_name: saved.file_name,
            file_path: saved.file_path,
            bytes: saved.bytes,
            media_type: saved.media_type,
            via: saved.via,
            tagged: saved.tagged,
        }),
        PipelineResult::Failure(failure) => Err(ApiError::Pipeline(failure)),
    }
}

/// Build pipeline routes
pub fn pipeline_routes() -> Router<AppState> {
    Router::new()
        .route("/preview", post(preview))
        .route("/download", post(download))
}
