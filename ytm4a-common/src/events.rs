//! Event types for the ytm4a event system
//!
//! Provides the pipeline progress types and the EventBus shared by the
//! pipeline and its observers (SSE clients, the CLI).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Pipeline stage reported with every progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Resolving,
    Fetching,
    Converting,
    Complete,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Resolving => "resolving",
            Stage::Fetching => "fetching",
            Stage::Converting => "converting",
            Stage::Complete => "complete",
            Stage::Failed => "failed",
        }
    }
}

/// One progress notification within a run
///
/// Percentages never decrease within a run, except for the reset to 0 when
/// the run fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// 0-100
    pub percentage: u8,
    pub stage: Stage,
    pub message: String,
}

/// Which user action started a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOperation {
    Preview,
    Download,
}

/// ytm4a event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// A preview or download run was accepted
    RunStarted {
        run_id: Uuid,
        operation: RunOperation,
        source_url: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Progress within a run
    ProgressUpdate {
        run_id: Uuid,
        #[serde(flatten)]
        progress: ProgressEvent,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Run reached `complete`
    RunCompleted {
        run_id: Uuid,
        operation: RunOperation,
        /// Suggested filename for downloads, `None` for previews
        file_name: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Run reached `failed`
    RunFailed {
        run_id: Uuid,
        operation: RunOperation,
        /// Machine-readable error kind (e.g. `MEDIA_UNAVAILABLE`)
        kind: String,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PipelineEvent {
    /// SSE event name
    pub fn event_type(&self) -> &str {
        match self {
            PipelineEvent::RunStarted { .. } => "RunStarted",
            PipelineEvent::ProgressUpdate { .. } => "ProgressUpdate",
            PipelineEvent::RunCompleted { .. } => "RunCompleted",
            PipelineEvent::RunFailed { .. } => "RunFailed",
        }
    }

    pub fn run_id(&self) -> Uuid {
        match self {
            PipelineEvent::RunStarted { run_id, .. }
            | PipelineEvent::ProgressUpdate { run_id, .. }
            | PipelineEvent::RunCompleted { run_id, .. }
            | PipelineEvent::RunFailed { run_id, .. } => *run_id,
        }
    }
}

/// Central event distribution bus
///
/// Wraps a tokio broadcast channel:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Subscribers that detach simply stop receiving; producers are unaffected
///
/// # Examples
///
/// ```
/// use ytm4a_common::events::EventBus;
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
/// assert_eq!(event_bus.subscriber_count(), 1);
/// # drop(rx);
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PipelineEvent,
    ) -> Result<usize, broadcast::error::SendError<PipelineEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Progress is best-effort: a run never depends on being observed.
    pub fn emit_lossy(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(run_id: Uuid, percentage: u8, stage: Stage) -> PipelineEvent {
        PipelineEvent::ProgressUpdate {
            run_id,
            progress: ProgressEvent {
                percentage,
                stage,
                message: "working".to_string(),
            },
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_progress_update_serializes_flat() {
        let run_id = Uuid::new_v4();
        let json = serde_json::to_value(progress(run_id, 40, Stage::Fetching)).unwrap();

        assert_eq!(json["type"], "ProgressUpdate");
        assert_eq!(json["percentage"], 40);
        assert_eq!(json["stage"], "fetching");
        assert_eq!(json["message"], "working");
        assert_eq!(json["run_id"], run_id.to_string());
    }

    #[test]
    fn test_stage_names_match_serde() {
        for stage in [
            Stage::Resolving,
            Stage::Fetching,
            Stage::Converting,
            Stage::Complete,
            Stage::Failed,
        ] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage.as_str()));
        }
    }

    #[tokio::test]
    async fn test_emit_reaches_subscriber_in_order() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let run_id = Uuid::new_v4();

        bus.emit(progress(run_id, 10, Stage::Resolving)).unwrap();
        bus.emit(progress(run_id, 30, Stage::Fetching)).unwrap();

        match rx.recv().await.unwrap() {
            PipelineEvent::ProgressUpdate { progress, .. } => assert_eq!(progress.percentage, 10),
            other => panic!("unexpected event {:?}", other),
        }
        match rx.recv().await.unwrap() {
            PipelineEvent::ProgressUpdate { progress, .. } => assert_eq!(progress.percentage, 30),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(10);
        let run_id = Uuid::new_v4();

        assert!(bus.emit(progress(run_id, 10, Stage::Resolving)).is_err());
        // Lossy emit must not panic when nobody listens
        bus.emit_lossy(progress(run_id, 10, Stage::Resolving));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_dropped_subscriber_detaches() {
        let bus = EventBus::new(10);
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.capacity(), 10);
    }
}
