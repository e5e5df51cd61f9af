//! API request and response types

use crate::conversation::{SessionSummary, Stage};
use crate::reply::{ReplyView, StructuredReply};
use crate::transcript::{Transcript, Turn};
use serde::{Deserialize, Serialize};

/// Stateless exchange: the client owns and resends the history
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<Turn>,
    #[serde(rename = "userInput")]
    pub user_input: String,
}

/// Exchange within a server-side session
#[derive(Debug, Deserialize)]
pub struct SessionChatRequest {
    pub text: String,
}

/// Result of one exchange
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// The validated reply in its wire shape
    pub response: StructuredReply,
    /// Full history including the new user and assistant turns
    pub messages: Transcript,
    pub view: ReplyView,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: SessionSummary,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
}

/// Session with its history
#[derive(Debug, Serialize)]
pub struct SessionWithMessagesResponse {
    pub session: SessionSummary,
    pub messages: Transcript,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<ReplyView>,
}

/// Response for cancel action
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub ok: bool,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Model information for API response
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub description: String,
    pub context_window: usize,
}

/// Response for model list
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
    pub default: String,
}

#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub version: String,
    pub model: String,
}

/// Error response
#[derive(Debug, Default, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Unparseable model output, verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    /// Transcript to retry from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Transcript>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            ..Default::default()
        }
    }
}
