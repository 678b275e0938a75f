//! # ytm4a Common Library
//!
//! Shared code for the ytm4a crates including:
//! - Event types (`PipelineEvent`) and the `EventBus`
//! - Configuration loading and output folder resolution
//! - Server-Sent Events helpers
//! - Common error type

pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
