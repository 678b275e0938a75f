//! Single in-flight run per session
//!
//! A second preview or download while one is running is rejected, not queued.
//! The permit is owned, so it can move into the task executing the run and is
//! released when that task finishes, even if the requester went away.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::PipelineError;

#[derive(Clone)]
pub struct RunGate {
    semaphore: Arc<Semaphore>,
}

/// Held for the lifetime of one run
pub struct RunPermit {
    _permit: OwnedSemaphorePermit,
}

impl RunGate {
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn try_begin(&self) -> Result<RunPermit, PipelineError> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .map(|permit| RunPermit { _permit: permit })
            .map_err(|_| PipelineError::RunInProgress)
    }

    pub fn is_busy(&self) -> bool {
        self.semaphore.available_permits() == 0
    }
}

impl Default for RunGate {
    fn default() -> Self {
        Self::new()
    }
}
