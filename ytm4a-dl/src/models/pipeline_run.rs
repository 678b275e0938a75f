//! Pipeline run state machine
//!
//! One instance per run:
//! IDLE → RESOLVING → FETCHING → CONVERTING → COMPLETE, with a side exit to
//! FAILED from any non-terminal state. A preview skips CONVERTING.
//!
//! Percentages never decrease within a run. Entering FAILED resets to 0.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use ytm4a_common::events::{ProgressEvent, RunOperation, Stage};

/// Run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunState {
    /// Created, nothing emitted yet
    Idle,
    /// Validating input, resolving the identifier
    Resolving,
    /// Metadata lookup and media retrieval
    Fetching,
    /// Repackaging into the target container
    Converting,
    /// Finished successfully
    Complete,
    /// Finished with an error
    Failed,
}

impl RunState {
    fn rank(&self) -> u8 {
        match self {
            RunState::Idle => 0,
            RunState::Resolving => 1,
            RunState::Fetching => 2,
            RunState::Converting => 3,
            RunState::Complete => 4,
            RunState::Failed => 5,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Complete | RunState::Failed)
    }

    /// Progress stage reported for this state; `None` for IDLE
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RunState::Idle => None,
            RunState::Resolving => Some(Stage::Resolving),
            RunState::Fetching => Some(Stage::Fetching),
            RunState::Converting => Some(Stage::Converting),
            RunState::Complete => Some(Stage::Complete),
            RunState::Failed => Some(Stage::Failed),
        }
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub run_id: Uuid,
    pub old_state: RunState,
    pub new_state: RunState,
    pub transitioned_at: DateTime<Utc>,
}

/// Rejected transition
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid run transition {from:?} → {to:?}")]
pub struct InvalidTransition {
    pub from: RunState,
    pub to: RunState,
}

/// Run-scoped pipeline state (in-memory only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub operation: RunOperation,
    pub state: RunState,
    /// Last reported percentage
    pub percentage: u8,
    pub started_at: DateTime<Utc>,
    /// Set on COMPLETE or FAILED
    pub ended_at: Option<DateTime<Utc>>,
    pub transitions: Vec<StateTransition>,
}

impl PipelineRun {
    pub fn new(operation: RunOperation) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            operation,
            state: RunState::Idle,
            percentage: 0,
            started_at: Utc::now(),
            ended_at: None,
            transitions: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Move forward (or stay, for sub-steps within a state) and report progress
    ///
    /// The reported percentage is clamped so it never drops below the last
    /// one. COMPLETE always reports 100. Use [`PipelineRun::fail`] for FAILED.
    pub fn advance(
        &mut self,
        new_state: RunState,
        percentage: u8,
        message: impl Into<String>,
    ) -> Result<ProgressEvent, InvalidTransition> {
        let invalid = InvalidTransition {
            from: self.state,
            to: new_state,
        };
        if self.is_terminal()
            || matches!(new_state, RunState::Idle | RunState::Failed)
            || new_state.rank() < self.state.rank()
        {
            return Err(invalid);
        }
        let Some(stage) = new_state.stage() else {
            return Err(invalid);
        };

        self.percentage = if new_state == RunState::Complete {
            100
        } else {
            percentage.min(100).max(self.percentage)
        };
        self.transition_to(new_state);

        Ok(ProgressEvent {
            percentage: self.percentage,
            stage,
            message: message.into(),
        })
    }

    /// Enter FAILED, resetting progress to 0
    pub fn fail(&mut self, message: impl Into<String>) -> Result<ProgressEvent, InvalidTransition> {
        if self.is_terminal() {
            return Err(InvalidTransition {
                from: self.state,
                to: RunState::Failed,
            });
        }

        self.percentage = 0;
        self.transition_to(RunState::Failed);

        Ok(ProgressEvent {
            percentage: 0,
            stage: Stage::Failed,
            message: message.into(),
        })
    }

    fn transition_to(&mut self, new_state: RunState) {
        if new_state != self.state {
            self.transitions.push(StateTransition {
                run_id: self.run_id,
                old_state: self.state,
                new_state,
                transitioned_at: Utc::now(),
            });
            self.state = new_state;
        }

        if new_state.is_terminal() {
            self.ended_at = Some(Utc::now());
        }
    }
}
