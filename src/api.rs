//! HTTP API for the triage service

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::conversation::{Conversation, SessionStore};
use crate::llm::ModelRegistry;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub conversation: Arc<Conversation>,
    pub sessions: Arc<SessionStore>,
    pub llm_registry: Arc<ModelRegistry>,
}

impl AppState {
    pub fn new(conversation: Conversation, llm_registry: Arc<ModelRegistry>) -> Self {
        let conversation = Arc::new(conversation);
        Self {
            sessions: Arc::new(SessionStore::new(Arc::clone(&conversation))),
            conversation,
            llm_registry,
        }
    }
}
