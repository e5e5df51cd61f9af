//! Symptom triage service
//!
//! Conducts a structured symptom interview with a chat-completion model and
//! turns its JSON replies into questions and assessments a UI can render.

mod api;
mod config;
mod conversation;
mod llm;
mod prompt;
mod reply;
mod state_machine;
mod transcript;

use api::{create_router, AppState};
use config::AppConfig;
use conversation::Conversation;
use llm::{ModelRegistry, OPENAI_API_KEY_VAR};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "symptom_triage=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env()?;

    let contract = config.load_prompt()?;
    tracing::info!(version = %contract.version(), "Prompt contract loaded");

    // Initialize LLM registry
    let llm_registry = Arc::new(ModelRegistry::new(&config.llm));
    let Some(gateway) = llm_registry.default() else {
        tracing::error!(
            model = %llm_registry.default_model_id(),
            available = ?llm_registry.available_models(),
            "No model available. Set {}.",
            OPENAI_API_KEY_VAR
        );
        return Err(format!(
            "model {} is not configured; {OPENAI_API_KEY_VAR} is missing",
            llm_registry.default_model_id()
        )
        .into());
    };
    tracing::info!(
        models = ?llm_registry.available_models(),
        default = %llm_registry.default_model_id(),
        "LLM registry initialized"
    );

    let conversation = Conversation::new(gateway, contract, config.conversation_config());
    let state = AppState::new(conversation, llm_registry);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Symptom triage server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
