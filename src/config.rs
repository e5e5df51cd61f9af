//! Startup configuration from environment variables

use crate::conversation::ConversationConfig;
use crate::llm::LlmConfig;
use crate::prompt::PromptContract;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_TOKENS: u32 = 500;
const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Version label for prompts loaded from a file without an explicit version
const CUSTOM_PROMPT_VERSION: &str = "custom";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key}={value:?} is not valid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("Failed to read prompt from {path}: {source}")]
    Prompt {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Replaces the built-in system prompt when set
    pub prompt_path: Option<PathBuf>,
    pub prompt_version: Option<String>,
    pub gateway_timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
    pub llm: LlmConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let gateway_timeout_secs: u64 = parse_var(
            "TRIAGE_GATEWAY_TIMEOUT_SECS",
            get("TRIAGE_GATEWAY_TIMEOUT_SECS"),
            DEFAULT_GATEWAY_TIMEOUT_SECS,
        )?;
        if gateway_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "TRIAGE_GATEWAY_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let temperature: f32 = parse_var(
            "TRIAGE_TEMPERATURE",
            get("TRIAGE_TEMPERATURE"),
            DEFAULT_TEMPERATURE,
        )?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Invalid {
                key: "TRIAGE_TEMPERATURE",
                value: temperature.to_string(),
                reason: "must be between 0 and 2".to_string(),
            });
        }

        Ok(Self {
            port: parse_var("TRIAGE_PORT", get("TRIAGE_PORT"), DEFAULT_PORT)?,
            prompt_path: get("TRIAGE_PROMPT_PATH").map(PathBuf::from),
            prompt_version: get("TRIAGE_PROMPT_VERSION"),
            gateway_timeout: Duration::from_secs(gateway_timeout_secs),
            max_tokens: parse_var(
                "TRIAGE_MAX_TOKENS",
                get("TRIAGE_MAX_TOKENS"),
                DEFAULT_MAX_TOKENS,
            )?,
            temperature,
            llm: LlmConfig::from_lookup(&lookup)
                .with_request_timeout(Duration::from_secs(gateway_timeout_secs)),
        })
    }

    /// The prompt contract to run with: the file at `prompt_path`, or the
    /// built-in prompt.
    pub fn load_prompt(&self) -> Result<PromptContract, ConfigError> {
        let Some(path) = &self.prompt_path else {
            let contract = PromptContract::default();
            return Ok(match &self.prompt_version {
                Some(version) => PromptContract::new(version.as_str(), contract.text()),
                None => contract,
            });
        };

        let version = self
            .prompt_version
            .clone()
            .unwrap_or_else(|| CUSTOM_PROMPT_VERSION.to_string());
        PromptContract::from_file(path, version).map_err(|source| ConfigError::Prompt {
            path: path.clone(),
            source,
        })
    }

    pub fn conversation_config(&self) -> ConversationConfig {
        ConversationConfig {
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            timeout: self.gateway_timeout,
        }
    }
}

fn parse_var<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value: raw,
        }),
    }
}
