//! Server-Sent Events for pipeline progress

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use tracing::debug;

use crate::AppState;

/// GET /events
///
/// Streams `RunStarted`, `ProgressUpdate`, `RunCompleted` and `RunFailed`.
/// Disconnecting never affects a run in progress.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!(
        subscribers = state.event_bus.subscriber_count() + 1,
        "Subscribing SSE client"
    );

    ytm4a_common::sse::pipeline_sse_stream("ytm4a-dl", state.event_bus.subscribe())
}
