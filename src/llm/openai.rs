//! `OpenAI` provider implementation

use super::types::{LlmMessage, LlmRequest, LlmResponse, MessageRole, ResponseFormat, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Supported `OpenAI` chat models
#[derive(Debug, Clone, Copy)]
pub enum OpenAIModel {
    GPT4Turbo,
    GPT4o,
    GPT4oMini,
}

impl OpenAIModel {
    pub fn api_name(self) -> &'static str {
        match self {
            OpenAIModel::GPT4Turbo => "gpt-4-turbo-preview",
            OpenAIModel::GPT4o => "gpt-4o",
            OpenAIModel::GPT4oMini => "gpt-4o-mini",
        }
    }
}

/// `OpenAI` chat-completions service
pub struct OpenAIService {
    client: Client,
    api_key: String,
    model: OpenAIModel,
}

impl OpenAIService {
    pub fn new(api_key: String, model: OpenAIModel, timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }

    fn translate_request(&self, request: &LlmRequest) -> OpenAIRequest {
        let response_format = match request.response_format {
            ResponseFormat::Text => None,
            ResponseFormat::JsonObject => Some(OpenAIResponseFormat {
                r#type: "json_object".to_string(),
            }),
        };

        OpenAIRequest {
            model: self.model.api_name().to_string(),
            messages: request.messages.iter().map(translate_message).collect(),
            response_format,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        }
    }

    pub(super) fn normalize_response(resp: OpenAIResponse) -> Result<LlmResponse, LlmError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::unknown("No choices in response"))?;

        if let Some(refusal) = choice.message.refusal.filter(|r| !r.is_empty()) {
            return Err(LlmError::content_filter(format!(
                "Model refused to answer: {refusal}"
            )));
        }

        match choice.finish_reason.as_deref() {
            Some("content_filter") => {
                return Err(LlmError::content_filter(
                    "Completion was blocked by the provider's content filter",
                ));
            }
            Some("length") => {
                tracing::warn!("Completion hit the token limit; reply is likely truncated");
            }
            _ => {}
        }

        let end_turn = choice.finish_reason.as_deref() == Some("stop");
        let usage = resp.usage.unwrap_or_default();

        Ok(LlmResponse {
            text: choice.message.content.unwrap_or_default(),
            end_turn,
            usage: Usage {
                input_tokens: u64::from(usage.prompt_tokens),
                output_tokens: u64::from(usage.completion_tokens),
            },
        })
    }
}

pub(super) fn translate_message(msg: &LlmMessage) -> OpenAIMessage {
    let role = match msg.role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    };

    OpenAIMessage {
        role: role.to_string(),
        content: Some(msg.content.clone()),
        refusal: None,
    }
}

/// Map a non-2xx provider answer onto an error kind
fn classify_status(status: StatusCode, body: &str, retry_after: Option<Duration>) -> LlmError {
    let (message, code) = match serde_json::from_str::<OpenAIErrorResponse>(body) {
        Ok(resp) => (resp.error.message, resp.error.code),
        Err(_) => (body.to_string(), None),
    };

    let err = match status.as_u16() {
        400 if code.as_deref() == Some("content_policy_violation") => {
            LlmError::content_filter(format!("Content policy violation: {message}"))
        }
        400 => LlmError::invalid_request(format!("Invalid request: {message}")),
        401 | 403 => LlmError::auth(format!("Authentication failed: {message}")),
        408 | 504 => LlmError::timeout(format!("Upstream timeout: {message}")),
        429 => {
            let err = LlmError::rate_limit(format!("Rate limit exceeded: {message}"));
            match retry_after {
                Some(delay) => err.with_retry_after(delay),
                None => err,
            }
        }
        500..=599 => LlmError::server_error(format!("Server error: {message}")),
        _ => LlmError::unknown(format!("HTTP {status}: {message}")),
    };

    err.with_status(status.as_u16())
}

#[async_trait]
impl LlmService for OpenAIService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let openai_request = self.translate_request(request);

        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&openai_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::timeout(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::network(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(classify_status(status, &body, retry_after));
        }

        let openai_response: OpenAIResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Self::normalize_response(openai_response)
    }

    fn model_id(&self) -> &str {
        self.model.api_name()
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
pub(super) struct OpenAIRequest {
    pub(super) model: String,
    pub(super) messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) response_format: Option<OpenAIResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) temperature: Option<f32>,
    pub(super) stream: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct OpenAIResponseFormat {
    pub(super) r#type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct OpenAIMessage {
    pub(super) role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) content: Option<String>,
    #[serde(default, skip_serializing)]
    pub(super) refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OpenAIResponse {
    pub(super) choices: Vec<OpenAIChoice>,
    #[serde(default)]
    pub(super) usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OpenAIChoice {
    pub(super) message: OpenAIMessage,
    pub(super) finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[allow(clippy::struct_field_names)]
pub(super) struct OpenAIUsage {
    pub(super) prompt_tokens: u32,
    pub(super) completion_tokens: u32,
    #[allow(dead_code)] // Part of API response, not always used
    #[serde(default)]
    pub(super) total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
    #[allow(dead_code)]
    r#type: Option<String>,
    code: Option<String>,
}
