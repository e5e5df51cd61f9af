//! Model registry for managing available LLM models

use super::models::OPENAI_API_KEY_VAR;
use super::{all_models, LlmService, LoggingService, ModelDef};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Model used when `DEFAULT_MODEL` is not set
pub const PREFERRED_DEFAULT_MODEL: &str = "gpt-4-turbo-preview";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for LLM providers
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub openai_api_key: Option<String>,
    /// Default model ID
    pub default_model: Option<String>,
    /// HTTP client timeout for provider calls
    pub request_timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            default_model: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl LlmConfig {
    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            openai_api_key: non_empty(OPENAI_API_KEY_VAR),
            default_model: non_empty("DEFAULT_MODEL"),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Registry of available LLM models
pub struct ModelRegistry {
    services: HashMap<String, Arc<dyn LlmService>>,
    default_model: String,
}

impl ModelRegistry {
    pub fn new(config: &LlmConfig) -> Self {
        let mut services: HashMap<String, Arc<dyn LlmService>> = HashMap::new();

        for model_def in all_models() {
            if let Some(service) = Self::try_create_model(model_def, config) {
                services.insert(model_def.id.to_string(), service);
            }
        }

        let requested = config.default_model.as_deref().filter(|id| {
            let available = services.contains_key(*id);
            if !available {
                tracing::warn!(
                    model = %id,
                    "DEFAULT_MODEL is not an available model, falling back"
                );
            }
            available
        });

        let default_model = requested
            .map(str::to_string)
            .or_else(|| {
                if services.contains_key(PREFERRED_DEFAULT_MODEL) {
                    Some(PREFERRED_DEFAULT_MODEL.to_string())
                } else {
                    let mut ids: Vec<_> = services.keys().cloned().collect();
                    ids.sort();
                    ids.into_iter().next()
                }
            })
            .unwrap_or_else(|| PREFERRED_DEFAULT_MODEL.to_string());

        Self {
            services,
            default_model,
        }
    }

    /// Registry over a single pre-built service, used by tests
    #[cfg(test)]
    pub fn with_service(service: Arc<dyn LlmService>) -> Self {
        let id = service.model_id().to_string();
        let mut services: HashMap<String, Arc<dyn LlmService>> = HashMap::new();
        services.insert(id.clone(), service);
        Self {
            services,
            default_model: id,
        }
    }

    fn try_create_model(model_def: &ModelDef, config: &LlmConfig) -> Option<Arc<dyn LlmService>> {
        let api_key = config.openai_api_key.as_deref()?;

        match model_def.build(api_key, config.request_timeout) {
            Ok(service) => Some(Arc::new(LoggingService::new(service))),
            Err(e) => {
                tracing::warn!(model = model_def.id, error = %e, "Skipping model");
                None
            }
        }
    }

    /// Get a model by ID
    pub fn get(&self, model_id: &str) -> Option<Arc<dyn LlmService>> {
        self.services.get(model_id).cloned()
    }

    /// Get the default model
    pub fn default(&self) -> Option<Arc<dyn LlmService>> {
        self.get(&self.default_model)
    }

    pub fn default_model_id(&self) -> &str {
        &self.default_model
    }

    /// List all available model IDs
    pub fn available_models(&self) -> Vec<String> {
        let mut models: Vec<_> = self.services.keys().cloned().collect();
        models.sort();
        models
    }

    /// Get detailed information about available models
    pub fn available_model_info(&self) -> Vec<crate::api::ModelInfo> {
        all_models()
            .iter()
            .filter(|def| self.services.contains_key(def.id))
            .map(|def| crate::api::ModelInfo {
                id: def.id.to_string(),
                description: def.description.to_string(),
                context_window: def.context_window,
            })
            .collect()
    }
}
