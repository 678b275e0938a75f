//! Server-Sent Events (SSE) utilities

use crate::events::PipelineEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

/// Heartbeat interval for all SSE streams
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Convert one bus event to an SSE frame
///
/// Returns `None` if the event cannot be serialized.
pub fn to_sse_event(event: &PipelineEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(event.event_type()).data(json)),
        Err(e) => {
            warn!("SSE: Failed to serialize event {}: {}", event.event_type(), e);
            None
        }
    }
}

/// Forward pipeline events from a bus subscription to an SSE client
///
/// The stream starts with a `ConnectionStatus: connected` frame. Lagged
/// receivers skip the missed events; the stream ends when the bus is closed.
/// Dropping the stream (client disconnect) only drops this subscription.
pub fn pipeline_sse_stream(
    service_name: &'static str,
    mut rx: broadcast::Receiver<PipelineEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to {} events", service_name);

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("ConnectionStatus").data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) => {
                    debug!("SSE: Forwarding {} for run {}", event.event_type(), event.run_id());
                    if let Some(frame) = to_sse_event(&event) {
                        yield Ok(frame);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("SSE: {} client lagged, skipped {} events", service_name, skipped);
                }
                Err(RecvError::Closed) => {
                    info!("SSE: {} event bus closed", service_name);
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}
