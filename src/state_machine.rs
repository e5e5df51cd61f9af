//! Conversation turn-taking state machine
//!
//! Pure transitions: given the same state and event, `transition` always
//! produces the same result and performs no I/O. There is no terminal
//! state; an assessment is just another reply, and the user may keep going.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Conversation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    #[default]
    AwaitingUserInput,
    /// A gateway call is outstanding
    AwaitingModel { since: DateTime<Utc> },
}

impl ConvState {
    pub fn is_busy(&self) -> bool {
        matches!(self, ConvState::AwaitingModel { .. })
    }
}

/// Events that trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    UserSubmitted { at: DateTime<Utc> },
    /// The reply was validated and appended
    ReplyAccepted,
    /// Gateway failure, validation failure or cancellation
    ExchangeFailed,
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A reply is still pending, cannot accept another message")]
    Busy,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(state: &ConvState, event: Event) -> Result<ConvState, TransitionError> {
    match (state, event) {
        (ConvState::AwaitingUserInput, Event::UserSubmitted { at }) => {
            Ok(ConvState::AwaitingModel { since: at })
        }
        (ConvState::AwaitingModel { .. }, Event::UserSubmitted { .. }) => {
            Err(TransitionError::Busy)
        }
        (ConvState::AwaitingModel { .. }, Event::ReplyAccepted | Event::ExchangeFailed) => {
            Ok(ConvState::AwaitingUserInput)
        }
        (ConvState::AwaitingUserInput, event) => Err(TransitionError::InvalidTransition(
            format!("{event:?} while awaiting user input"),
        )),
    }
}
