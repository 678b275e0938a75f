//! HTTP Server & Routing Integration Tests
//! Test File: http_server_tests.rs

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use helpers::*;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use ytm4a_common::events::EventBus;
use ytm4a_dl::{build_router, AppState};

/// App state over mocks; files land in `output`
fn test_app_state(
    remote: Option<Arc<MockRemote>>,
    routes: Arc<MockRoutes>,
    output: &std::path::Path,
) -> AppState {
    let event_bus = Arc::new(EventBus::new(100));
    let orchestrator = orchestrator(remote, MockEmbed::blocked(), routes, event_bus.clone(), output);
    AppState::new(Arc::new(orchestrator), event_bus)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// TC-HTTP-001: Health endpoint reports module identity
#[tokio::test]
async fn tc_http_001_health_check() {
    // Given: service without a backend
    let dir = tempfile::tempdir().unwrap();
    let app = build_router(test_app_state(None, MockRoutes::all_failing(), dir.path()));

    // When: GET /health
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    // Then: 200 with identity, degraded status, idle gate
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["module"], "ytm4a-dl");
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["run_in_progress"], false);
    assert!(json.get("last_error").is_none());
}

/// TC-HTTP-002: Invalid URL → 400 INVALID_SOURCE
#[tokio::test]
async fn tc_http_002_preview_invalid_source() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_router(test_app_state(None, MockRoutes::all_failing(), dir.path()));

    let response = app
        .oneshot(post_json("/preview", json!({"url": "https://vimeo.com/123"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "INVALID_SOURCE");
}

/// TC-HTTP-003: Playlist URL → 400 UNSUPPORTED_COLLECTION
#[tokio::test]
async fn tc_http_003_preview_playlist_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_router(test_app_state(None, MockRoutes::all_failing(), dir.path()));

    let response = app
        .oneshot(post_json(
            "/preview",
            json!({"url": "https://www.youtube.com/watch?v=abc123&list=PL1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "UNSUPPORTED_COLLECTION");
}

/// TC-HTTP-004: Degraded preview returns placeholder metadata
#[tokio::test]
async fn tc_http_004_preview_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_router(test_app_state(None, MockRoutes::all_failing(), dir.path()));

    let response = app
        .oneshot(post_json("/preview", json!({"url": "https://youtu.be/abc123"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["title"], "YouTube Video abc123");
    assert_eq!(json["author"], "Unknown Artist");
    assert_eq!(json["degraded"], true);
}

/// TC-HTTP-005: Blank title → 400 VALIDATION_ERROR, nothing requested
#[tokio::test]
async fn tc_http_005_download_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let routes = MockRoutes::succeeding_at("http://relay-one.test/", b"bytes");
    let app = build_router(test_app_state(None, routes.clone(), dir.path()));

    let response = app
        .oneshot(post_json(
            "/download",
            json!({"url": "https://youtu.be/abc123", "title": "  ", "artist": "Band"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    assert!(routes.requested().is_empty());
}

/// TC-HTTP-006: Second run while one is in flight → 409
#[tokio::test]
async fn tc_http_006_run_in_progress_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_app_state(None, MockRoutes::all_failing(), dir.path());
    let app = build_router(state.clone());

    // Given: a run holding the gate
    let _running = state.run_gate.try_begin().unwrap();

    // When: another preview arrives
    let response = app
        .oneshot(post_json("/preview", json!({"url": "https://youtu.be/abc123"})))
        .await
        .unwrap();

    // Then: rejected, not queued
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "RUN_IN_PROGRESS");
}

/// TC-HTTP-007: Local download saves the file and releases the gate
#[tokio::test]
async fn tc_http_007_download_saves_file() {
    let dir = tempfile::tempdir().unwrap();
    let routes = MockRoutes::succeeding_at("http://relay-one.test/", b"audio-bytes");
    let state = test_app_state(None, routes, dir.path());
    let app = build_router(state.clone());

    let response = app
        .oneshot(post_json(
            "/download",
            json!({"url": "https://youtu.be/abc123", "title": "Song", "artist": "Band"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["file_name"], "Band - Song.m4a");
    assert_eq!(json["media_type"], "audio/mp4");
    assert_eq!(json["via"], "local");
    assert_eq!(json["bytes"], 11);

    let saved = std::fs::read(dir.path().join("Band - Song.m4a")).unwrap();
    assert_eq!(saved, b"audio-bytes".to_vec());
    assert!(!state.run_gate.is_busy());
}

/// TC-HTTP-008: Exhausted routes → 502 and last_error recorded
#[tokio::test]
async fn tc_http_008_media_unavailable_records_error() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_app_state(None, MockRoutes::all_failing(), dir.path());

    let response = build_router(state.clone())
        .oneshot(post_json(
            "/download",
            json!({"url": "https://youtu.be/abc123", "title": "Song", "artist": "Band"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "MEDIA_UNAVAILABLE");

    let health = build_router(state.clone())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_json(health).await;
    assert!(json["last_error"]
        .as_str()
        .unwrap()
        .contains("YouTube restrictions"));
    assert!(!state.run_gate.is_busy());
}

/// TC-HTTP-009: Remote download keeps the backend's file name
#[tokio::test]
async fn tc_http_009_remote_download() {
    let dir = tempfile::tempdir().unwrap();
    let remote = MockRemote::new(RemoteBehavior::Ok);
    let app = build_router(test_app_state(
        Some(remote),
        MockRoutes::all_failing(),
        dir.path(),
    ));

    let response = app
        .oneshot(post_json(
            "/download",
            json!({"url": "https://youtu.be/abc123", "title": "Song", "artist": "Band"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["file_name"], "Band-Song.m4a");
    assert_eq!(json["via"], "remote");
    assert!(dir.path().join("Band-Song.m4a").exists());
}

/// TC-HTTP-010: SSE endpoint answers with an event stream
#[tokio::test]
async fn tc_http_010_events_stream() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_router(test_app_state(None, MockRoutes::all_failing(), dir.path()));

    let response = app
        .oneshot(Request::builder().uri("/events").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/event-stream"));
}

/// TC-HTTP-011: Body missing a field → 400 with the error envelope
#[tokio::test]
async fn tc_http_011_incomplete_body_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let routes = MockRoutes::succeeding_at("http://relay-one.test/", b"bytes");
    let state = test_app_state(None, routes.clone(), dir.path());

    // When: the artist field is missing
    let response = build_router(state.clone())
        .oneshot(post_json(
            "/download",
            json!({"url": "https://youtu.be/abc123", "title": "Song"}),
        ))
        .await
        .unwrap();

    // Then: 400 BAD_REQUEST naming the field, nothing started
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
    assert!(json["error"]["message"].as_str().unwrap().contains("artist"));
    assert!(routes.requested().is_empty());
    assert!(!state.run_gate.is_busy());
}

/// TC-HTTP-012: Malformed JSON → 400 with the error envelope
#[tokio::test]
async fn tc_http_012_malformed_json_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_router(test_app_state(None, MockRoutes::all_failing(), dir.path()));

    let request = Request::builder()
        .method("POST")
        .uri("/preview")
        .header("content-type", "application/json")
        .body(Body::from("{\"url\": "))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

/// TC-HTTP-013: Unwritable output folder → 500 STORAGE_ERROR, run ends failed
#[tokio::test]
async fn tc_http_013_save_failure_reported() {
    // Given: the output folder path is a regular file
    let dir = tempfile::tempdir().unwrap();
    let blocked_output = dir.path().join("output");
    std::fs::write(&blocked_output, b"not a folder").unwrap();

    let routes = MockRoutes::succeeding_at("http://relay-one.test/", b"audio-bytes");
    let state = test_app_state(None, routes, &blocked_output);
    let mut rx = state.event_bus.subscribe();

    // When: downloading
    let response = build_router(state.clone())
        .oneshot(post_json(
            "/download",
            json!({"url": "https://youtu.be/abc123", "title": "Song", "artist": "Band"}),
        ))
        .await
        .unwrap();

    // Then: typed error, last progress is Failed at 0, gate released
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "STORAGE_ERROR");

    let progress = progress_of(&drain(&mut rx));
    let last = progress.last().unwrap();
    assert_eq!(last.percentage, 0);
    assert_eq!(last.stage, ytm4a_common::events::Stage::Failed);
    assert!(!state.run_gate.is_busy());
}
