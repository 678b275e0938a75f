//! HTTP API handlers for ytm4a-dl
//!
//! Local REST + SSE surface used by the presentation layer.

pub mod health;
pub mod pipeline;
pub mod sse;

pub use health::health_routes;
pub use pipeline::pipeline_routes;
pub use sse::event_stream;
