use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of one stage against the form surface.
///
/// COLLAPSED → EXPANDING → EXPANDED_UNVERIFIED → EXPANDED_VERIFIED → FILLING → SAVED,
/// with FAILED reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageState {
    Collapsed,
    Expanding,
    ExpandedUnverified,
    ExpandedVerified,
    Filling,
    Saved,
    Failed,
}

impl StageState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageState::Saved | StageState::Failed)
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageState::Collapsed => write!(f, "COLLAPSED"),
            StageState::Expanding => write!(f, "EXPANDING"),
            StageState::ExpandedUnverified => write!(f, "EXPANDED_UNVERIFIED"),
            StageState::ExpandedVerified => write!(f, "EXPANDED_VERIFIED"),
            StageState::Filling => write!(f, "FILLING"),
            StageState::Saved => write!(f, "SAVED"),
            StageState::Failed => write!(f, "FAILED"),
        }
    }
}

/// Observations the stage runner feeds into the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    /// Readiness evidence already holds before any expand command.
    FoundOpen,
    /// An expand command was issued.
    ExpandIssued,
    /// The expand command returned without raising.
    ExpandReturned,
    /// The expand command raised; the section is treated as still collapsed.
    ExpandRaised,
    /// Readiness evidence observed.
    Verified,
    /// Readiness evidence did not appear within the bounded wait.
    VerifyTimedOut,
    /// Field operations begin.
    FillStarted,
    /// Save command issued and its confirmation observed.
    SaveConfirmed,
    /// Retries and recovery strategies are exhausted.
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid stage transition: {event:?} in {from}")]
pub struct InvalidTransition {
    pub from: StageState,
    pub event: StageEvent,
}

/// State and transition history of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProgress {
    pub stage: String,
    pub state: StageState,
    pub history: Vec<StageState>,
}

impl StageProgress {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            state: StageState::Collapsed,
            history: Vec::new(),
        }
    }

    /// Every state the stage has been in, current state last.
    pub fn trail(&self) -> Vec<StageState> {
        let mut trail = self.history.clone();
        trail.push(self.state);
        trail
    }
}

/// Pure transition function for [`StageProgress`].
pub struct StageMachine;

impl StageMachine {
    /// Computes the next state for `event` and applies it to `progress`.
    pub fn next(
        progress: &mut StageProgress,
        event: StageEvent,
    ) -> Result<StageState, InvalidTransition> {
        use StageEvent as E;
        use StageState as S;

        let next = match (progress.state, event) {
            (S::Collapsed, E::FoundOpen) => S::ExpandedVerified,
            (S::Collapsed, E::ExpandIssued) => S::Expanding,
            (S::Expanding, E::ExpandReturned) => S::ExpandedUnverified,
            (S::Expanding, E::ExpandRaised) => S::Collapsed,
            (S::ExpandedUnverified, E::Verified) => S::ExpandedVerified,
            (S::ExpandedUnverified, E::VerifyTimedOut) => S::Collapsed,
            (S::ExpandedVerified, E::FillStarted) => S::Filling,
            (S::Filling, E::SaveConfirmed) => S::Saved,
            (from, E::Abandoned) if !from.is_terminal() => S::Failed,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        progress.history.push(progress.state);
        progress.state = next;
        Ok(next)
    }
}
