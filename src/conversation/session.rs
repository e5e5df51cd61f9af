//! In-memory session store
//!
//! Each session owns its transcript and turn-taking state. Submits are
//! serialised per session by the state machine; the map lock is never held
//! across the gateway call.

use super::{Conversation, ConversationError, Exchange};
use crate::reply::{ReplyView, StructuredReply};
use crate::state_machine::{transition, ConvState, Event};
use crate::transcript::Transcript;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Session {0} already has a reply pending")]
    Busy(String),
    #[error(transparent)]
    Conversation(#[from] ConversationError),
}

struct Session {
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    transcript: Transcript,
    state: ConvState,
    last_reply: Option<StructuredReply>,
    /// Token for the in-flight exchange, if any
    cancel: Option<CancellationToken>,
}

impl Session {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            transcript: Transcript::new(),
            state: ConvState::default(),
            last_reply: None,
            cancel: None,
        }
    }

    fn summary(&self, id: &str) -> SessionSummary {
        SessionSummary {
            id: id.to_string(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            state: self.state,
            user_turns: self.transcript.user_turns(),
        }
    }
}

/// Session metadata
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub state: ConvState,
    pub user_turns: usize,
}

/// Session metadata plus its history
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub summary: SessionSummary,
    pub transcript: Transcript,
    /// View of the most recent accepted reply
    pub last_view: Option<ReplyView>,
}

pub struct SessionStore {
    conversation: Arc<Conversation>,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(conversation: Arc<Conversation>) -> Self {
        Self {
            conversation,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    // Every update is a single insert or assignment, so a poisoned map is
    // still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Session>> {
        self.sessions
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.sessions
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn create(&self) -> SessionSummary {
        let id = Uuid::new_v4().to_string();
        let session = Session::new(Utc::now());
        let summary = session.summary(&id);
        self.write().insert(id.clone(), session);
        tracing::info!(session_id = %id, "Session created");
        summary
    }

    pub fn get(&self, id: &str) -> Result<SessionSnapshot, SessionError> {
        let sessions = self.read();
        let session = sessions
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        Ok(SessionSnapshot {
            summary: session.summary(id),
            transcript: session.transcript.clone(),
            last_view: session.last_reply.as_ref().map(ReplyView::from),
        })
    }

    pub fn list(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = self
            .read()
            .iter()
            .map(|(id, session)| session.summary(id))
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries
    }

    /// Remove a session, abandoning any in-flight exchange
    pub fn delete(&self, id: &str) -> Result<(), SessionError> {
        let session = self
            .write()
            .remove(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        if let Some(token) = session.cancel {
            token.cancel();
        }
        tracing::info!(session_id = %id, "Session deleted");
        Ok(())
    }

    /// Cancel the in-flight exchange. Returns whether one was running.
    pub fn cancel(&self, id: &str) -> Result<bool, SessionError> {
        let sessions = self.read();
        let session = sessions
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        match &session.cancel {
            Some(token) => {
                token.cancel();
                tracing::info!(session_id = %id, "Exchange cancellation requested");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run one exchange for the session.
    ///
    /// On failure the session keeps its pre-call transcript. Dropping the
    /// returned future mid-call counts as a failed exchange.
    pub async fn submit(&self, id: &str, text: &str) -> Result<Exchange, SessionError> {
        let (transcript, in_flight) = self.begin(id)?;

        let result = self
            .conversation
            .submit(&transcript, text, &in_flight.cancel)
            .await;
        in_flight.disarm();

        if !self.settle(id, result.as_ref().ok()) {
            tracing::info!(session_id = %id, "Session deleted during exchange");
            return Err(SessionError::NotFound(id.to_string()));
        }
        result.map_err(SessionError::from)
    }

    fn begin<'a>(&'a self, id: &'a str) -> Result<(Transcript, InFlight<'a>), SessionError> {
        let mut sessions = self.write();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        session.state = transition(&session.state, Event::UserSubmitted { at: Utc::now() })
            .map_err(|e| {
                tracing::debug!(session_id = %id, error = %e, "Submit rejected");
                SessionError::Busy(id.to_string())
            })?;

        let cancel = CancellationToken::new();
        session.cancel = Some(cancel.clone());
        let in_flight = InFlight {
            store: self,
            id,
            cancel,
            armed: true,
        };
        Ok((session.transcript.clone(), in_flight))
    }

    /// Close out the in-flight exchange. `accepted` carries the exchange to
    /// commit; `None` leaves the transcript as it was. Returns false if the
    /// session no longer exists.
    fn settle(&self, id: &str, accepted: Option<&Exchange>) -> bool {
        let mut sessions = self.write();
        let Some(session) = sessions.get_mut(id) else {
            return false;
        };

        let event = if accepted.is_some() {
            Event::ReplyAccepted
        } else {
            Event::ExchangeFailed
        };
        match transition(&session.state, event) {
            Ok(next) => session.state = next,
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Unexpected transition failure");
                session.state = ConvState::AwaitingUserInput;
            }
        }
        session.cancel = None;
        session.updated_at = Utc::now();

        if let Some(exchange) = accepted {
            session.transcript = exchange.transcript.clone();
            session.last_reply = Some(exchange.reply.clone());
        }
        true
    }
}

/// Marks a session's exchange as in flight. Dropped while still armed, it
/// cancels the gateway call and returns the session to awaiting input.
struct InFlight<'a> {
    store: &'a SessionStore,
    id: &'a str,
    cancel: CancellationToken,
    armed: bool,
}

impl InFlight<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.cancel.cancel();
            tracing::info!(session_id = %self.id, "Exchange abandoned");
            self.store.settle(self.id, None);
        }
    }
}
