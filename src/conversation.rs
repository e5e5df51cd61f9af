//! Conversation controller
//!
//! Runs one exchange per `submit`: seed the system turn, append the user
//! turn, call the gateway, validate the reply, append the assistant turn.
//! The caller's transcript is never modified; every outcome is a new value.

mod session;

pub use session::{SessionError, SessionSnapshot, SessionStore, SessionSummary};

use crate::llm::{LlmError, LlmMessage, LlmRequest, LlmResponse, LlmService, ResponseFormat};
use crate::prompt::PromptContract;
use crate::reply::{parse, MalformedReply, ReplyView, StructuredReply};
use crate::transcript::{append_turn, ensure_system_preamble, Role, Transcript, Turn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Tunables for gateway requests
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Upper bound on a single gateway call
    pub timeout: Duration,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_tokens: Some(500),
            temperature: Some(0.7),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Successful exchange
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Input transcript plus the user and assistant turns
    pub transcript: Transcript,
    pub reply: StructuredReply,
}

impl Exchange {
    pub fn view(&self) -> ReplyView {
        ReplyView::from(&self.reply)
    }
}

/// Pipeline stage a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Input,
    Gateway,
    Validation,
}

/// Failure of a single exchange
///
/// Gateway and validation failures carry two transcripts: `snapshot` is the
/// caller's input, safe to retry from without duplicating the user turn;
/// `pending` is the snapshot plus the unanswered user turn.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("user input is empty")]
    EmptyInput,
    #[error("gateway call failed: {source}")]
    Gateway {
        source: LlmError,
        snapshot: Transcript,
        pending: Transcript,
    },
    #[error("model reply rejected: {source}")]
    Validation {
        source: MalformedReply,
        snapshot: Transcript,
        pending: Transcript,
    },
}

impl ConversationError {
    pub fn stage(&self) -> Stage {
        match self {
            ConversationError::EmptyInput => Stage::Input,
            ConversationError::Gateway { .. } => Stage::Gateway,
            ConversationError::Validation { .. } => Stage::Validation,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ConversationError::EmptyInput => "empty_input",
            ConversationError::Gateway { source, .. } => source.kind.as_str(),
            ConversationError::Validation { source, .. } => source.kind.as_str(),
        }
    }

    pub fn snapshot(&self) -> Option<&Transcript> {
        match self {
            ConversationError::EmptyInput => None,
            ConversationError::Gateway { snapshot, .. }
            | ConversationError::Validation { snapshot, .. } => Some(snapshot),
        }
    }

    pub fn pending(&self) -> Option<&Transcript> {
        match self {
            ConversationError::EmptyInput => None,
            ConversationError::Gateway { pending, .. }
            | ConversationError::Validation { pending, .. } => Some(pending),
        }
    }
}

/// Orchestrates exchanges against one gateway with one prompt contract
pub struct Conversation {
    gateway: Arc<dyn LlmService>,
    contract: PromptContract,
    config: ConversationConfig,
}

impl Conversation {
    pub fn new(
        gateway: Arc<dyn LlmService>,
        contract: PromptContract,
        config: ConversationConfig,
    ) -> Self {
        Self {
            gateway,
            contract,
            config,
        }
    }

    pub fn contract(&self) -> &PromptContract {
        &self.contract
    }

    pub fn model_id(&self) -> &str {
        self.gateway.model_id()
    }

    /// Run one exchange on top of `transcript`.
    ///
    /// Cancelling `cancel` abandons the gateway call and fails with a
    /// cancelled gateway error.
    pub async fn submit(
        &self,
        transcript: &Transcript,
        user_text: &str,
        cancel: &CancellationToken,
    ) -> Result<Exchange, ConversationError> {
        if user_text.trim().is_empty() {
            return Err(ConversationError::EmptyInput);
        }

        let seeded = ensure_system_preamble(transcript, &self.contract);
        let pending = append_turn(&seeded, Turn::user(user_text));
        let request = self.build_request(&pending);

        let raw = match self.call_gateway(&request, cancel).await {
            Ok(response) => response.text,
            Err(source) => {
                tracing::warn!(
                    stage = "gateway",
                    kind = source.kind.as_str(),
                    error = %source,
                    "Exchange failed"
                );
                return Err(ConversationError::Gateway {
                    source,
                    snapshot: transcript.clone(),
                    pending,
                });
            }
        };

        let reply = match parse(&raw) {
            Ok(reply) => reply,
            Err(source) => {
                tracing::warn!(
                    stage = "validation",
                    kind = source.kind.as_str(),
                    detail = %source.detail,
                    raw_len = raw.len(),
                    "Exchange failed"
                );
                return Err(ConversationError::Validation {
                    source,
                    snapshot: transcript.clone(),
                    pending,
                });
            }
        };

        let transcript = append_turn(&pending, Turn::assistant(raw));
        tracing::info!(
            response_type = reply.response_type(),
            turns = transcript.len(),
            "Exchange completed"
        );

        Ok(Exchange { transcript, reply })
    }

    fn build_request(&self, transcript: &Transcript) -> LlmRequest {
        let messages = transcript
            .turns()
            .iter()
            .map(|turn| match turn.role {
                Role::System => LlmMessage::system(turn.content.as_str()),
                Role::User => LlmMessage::user(turn.content.as_str()),
                Role::Assistant => LlmMessage::assistant(turn.content.as_str()),
            })
            .collect();

        LlmRequest {
            messages,
            response_format: ResponseFormat::JsonObject,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }

    async fn call_gateway(
        &self,
        request: &LlmRequest,
        cancel: &CancellationToken,
    ) -> Result<LlmResponse, LlmError> {
        let timeout = self.config.timeout;

        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                tracing::info!("Gateway call cancelled");
                Err(LlmError::cancelled("Request cancelled by caller"))
            }

            result = tokio::time::timeout(timeout, self.gateway.complete(request)) => {
                result.unwrap_or_else(|_| {
                    Err(LlmError::timeout(format!(
                        "No reply within {}s",
                        timeout.as_secs()
                    )))
                })
            }
        }
    }
}
