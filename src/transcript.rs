//! Conversation transcript
//!
//! An ordered, append-only log of role-tagged turns. Transcripts are treated
//! as immutable snapshots: every operation returns a new value and leaves its
//! input untouched, so two sessions can never alias the same history.

use crate::prompt::PromptContract;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role of a transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One entry in the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Assistant turns hold the raw reply text exactly as the model sent it
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Transcript shape violations, only possible for caller-supplied history
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptError {
    #[error("transcript must start with the system turn, found {found} at index 0")]
    MissingPreamble { found: &'static str },
    #[error("unexpected system turn at index {index}; only index 0 may be a system turn")]
    MisplacedSystemTurn { index: usize },
}

/// Ordered turn history exchanged with the model
///
/// If non-empty, index 0 is the single system turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Turn>", into = "Vec<Turn>")]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Number of user turns, i.e. how many exchanges have been attempted
    pub fn user_turns(&self) -> usize {
        self.turns.iter().filter(|t| t.role == Role::User).count()
    }
}

impl TryFrom<Vec<Turn>> for Transcript {
    type Error = TranscriptError;

    fn try_from(turns: Vec<Turn>) -> Result<Self, Self::Error> {
        if let Some(first) = turns.first() {
            if first.role != Role::System {
                return Err(TranscriptError::MissingPreamble {
                    found: first.role.as_str(),
                });
            }
        }

        if let Some(index) = turns
            .iter()
            .skip(1)
            .position(|t| t.role == Role::System)
        {
            return Err(TranscriptError::MisplacedSystemTurn { index: index + 1 });
        }

        Ok(Self { turns })
    }
}

impl From<Transcript> for Vec<Turn> {
    fn from(transcript: Transcript) -> Self {
        transcript.turns
    }
}

/// Append a turn, returning a new transcript one longer than the input.
///
/// System turns are only ever introduced by [`ensure_system_preamble`].
pub fn append_turn(transcript: &Transcript, turn: Turn) -> Transcript {
    debug_assert!(
        turn.role != Role::System,
        "system turns are added by ensure_system_preamble only"
    );
    let mut turns = Vec::with_capacity(transcript.len() + 1);
    turns.extend_from_slice(&transcript.turns);
    turns.push(turn);
    Transcript { turns }
}

/// Seed an empty transcript with the system turn; non-empty input is returned as-is.
pub fn ensure_system_preamble(transcript: &Transcript, contract: &PromptContract) -> Transcript {
    if transcript.is_empty() {
        Transcript {
            turns: vec![Turn::system(contract.text())],
        }
    } else {
        transcript.clone()
    }
}
