use ns_core::PrimitiveStatus;
use std::fmt;

use crate::error::{NsError, Result};

/// Lifecycle of a dispatched primitive as seen by the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollState {
    Dispatched,
    Polling,
    Completed,
    Failed,
    TimedOut,
}

impl PollState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dispatched => "dispatched",
            Self::Polling => "polling",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }

    /// State reached after observing `status` on the controller.
    pub fn from_status(status: PrimitiveStatus) -> Self {
        match status {
            PrimitiveStatus::Pending | PrimitiveStatus::Running => Self::Polling,
            PrimitiveStatus::Completed => Self::Completed,
            PrimitiveStatus::Failed => Self::Failed,
        }
    }
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct PollStateMachine;

impl PollStateMachine {
    pub fn validate_transition(from: &PollState, to: &PollState) -> Result<()> {
        if Self::allowed_transitions(from).contains(to) {
            Ok(())
        } else {
            Err(NsError::InvalidTransition {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }

    fn allowed_transitions(from: &PollState) -> Vec<PollState> {
        match from {
            PollState::Dispatched => vec![
                PollState::Polling,
                PollState::Completed,
                PollState::Failed,
                PollState::TimedOut,
            ],
            PollState::Polling => vec![
                PollState::Polling,
                PollState::Completed,
                PollState::Failed,
                PollState::TimedOut,
            ],
            PollState::Completed | PollState::Failed | PollState::TimedOut => vec![],
        }
    }

    pub fn can_transition(from: &PollState, to: &PollState) -> bool {
        Self::validate_transition(from, to).is_ok()
    }
}
