//! Centralized model definitions
//!
//! Every model the triage service can talk to is listed here.

use super::openai::{OpenAIModel, OpenAIService};
use super::{LlmError, LlmService};
use std::sync::Arc;
use std::time::Duration;

/// Environment variable holding the `OpenAI` API key
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Model definition with metadata
#[derive(Debug, Clone)]
pub struct ModelDef {
    /// User-facing model ID, identical to the API model name
    pub id: &'static str,
    pub description: &'static str,
    /// Context window size in tokens
    pub context_window: usize,
    model: OpenAIModel,
}

impl ModelDef {
    pub fn build(&self, api_key: &str, timeout: Duration) -> Result<Arc<dyn LlmService>, LlmError> {
        if api_key.is_empty() {
            return Err(LlmError::auth(format!("{} requires an API key", self.id)));
        }
        let service = OpenAIService::new(api_key.to_string(), self.model, timeout)?;
        Ok(Arc::new(service))
    }
}

/// Get all available model definitions
pub fn all_models() -> &'static [ModelDef] {
    &[
        ModelDef {
            id: "gpt-4-turbo-preview",
            description: "GPT-4 Turbo (reference triage model)",
            context_window: 128_000,
            model: OpenAIModel::GPT4Turbo,
        },
        ModelDef {
            id: "gpt-4o",
            description: "GPT-4o (balanced performance)",
            context_window: 128_000,
            model: OpenAIModel::GPT4o,
        },
        ModelDef {
            id: "gpt-4o-mini",
            description: "GPT-4o Mini (fast, cheap)",
            context_window: 128_000,
            model: OpenAIModel::GPT4oMini,
        },
    ]
}
