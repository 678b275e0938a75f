//! ytm4a-dl library interface
//!
//! YouTube URL → M4A acquisition pipeline with a remote-first, degraded local
//! fallback. Exposes the pipeline for the binary and for integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult, ErrorKind, PipelineError};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use ytm4a_common::events::EventBus;

use crate::services::{PipelineOrchestrator, RunGate};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PipelineOrchestrator>,
    /// Event bus for SSE broadcasting
    pub event_bus: Arc<EventBus>,
    /// One run at a time per service instance
    pub run_gate: RunGate,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last run failure for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    /// The orchestrator must publish on `event_bus`
    pub fn new(orchestrator: Arc<PipelineOrchestrator>, event_bus: Arc<EventBus>) -> Self {
        Self {
            orchestrator,
            event_bus,
            run_gate: RunGate::new(),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn record_error(&self, message: String) {
        *self.last_error.write().await = Some(message);
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::pipeline_routes())
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .with_state(state)
}
