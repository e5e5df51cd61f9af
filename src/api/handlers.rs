//! HTTP request handlers

use super::types::{
    CancelResponse, ChatRequest, ChatResponse, ErrorResponse, ModelsResponse, PromptResponse,
    SessionChatRequest, SessionListResponse, SessionResponse, SessionWithMessagesResponse,
    SuccessResponse,
};
use super::AppState;
use crate::conversation::{ConversationError, Exchange, SessionError};
use crate::llm::LlmErrorKind;
use crate::transcript::Transcript;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio_util::sync::CancellationToken;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Stateless exchange
        .route("/api/chat", post(chat))
        // Sessions
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/sessions/:id/chat", post(session_chat))
        .route("/api/sessions/:id/cancel", post(cancel_session))
        // Introspection
        .route("/api/models", get(list_models))
        .route("/api/prompt", get(get_prompt))
        .route("/version", get(get_version))
        .with_state(state)
}

fn chat_response(exchange: Exchange) -> Json<ChatResponse> {
    let view = exchange.view();
    Json(ChatResponse {
        response: exchange.reply,
        messages: exchange.transcript,
        view,
    })
}

// ============================================================
// Stateless Exchange
// ============================================================

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let transcript = Transcript::try_from(req.messages)
        .map_err(|e| AppError::BadRequest(format!("Invalid messages: {e}")))?;

    // Nothing to cancel it from; a dropped connection drops the future
    let exchange = state
        .conversation
        .submit(&transcript, &req.user_input, &CancellationToken::new())
        .await?;

    Ok(chat_response(exchange))
}

// ============================================================
// Sessions
// ============================================================

async fn list_sessions(State(state): State<AppState>) -> Json<SessionListResponse> {
    Json(SessionListResponse {
        sessions: state.sessions.list(),
    })
}

async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionResponse>) {
    let session = state.sessions.create();
    (StatusCode::CREATED, Json(SessionResponse { session }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionWithMessagesResponse>, AppError> {
    let snapshot = state.sessions.get(&id)?;
    Ok(Json(SessionWithMessagesResponse {
        session: snapshot.summary,
        messages: snapshot.transcript,
        view: snapshot.last_view,
    }))
}

async fn session_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SessionChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let exchange = state.sessions.submit(&id, &req.text).await?;
    Ok(chat_response(exchange))
}

async fn cancel_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CancelResponse>, AppError> {
    let ok = state.sessions.cancel(&id)?;
    Ok(Json(CancelResponse { ok }))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.sessions.delete(&id)?;
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// Introspection
// ============================================================

async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state.llm_registry.available_model_info(),
        default: state.llm_registry.default_model_id().to_string(),
    })
}

async fn get_prompt(State(state): State<AppState>) -> Json<PromptResponse> {
    Json(PromptResponse {
        version: state.conversation.contract().version().to_string(),
        model: state.conversation.model_id().to_string(),
    })
}

async fn get_version() -> &'static str {
    concat!("symptom-triage ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Conversation(ConversationError),
}

impl From<ConversationError> for AppError {
    fn from(e: ConversationError) -> Self {
        AppError::Conversation(e)
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(_) => AppError::NotFound(e.to_string()),
            SessionError::Busy(_) => AppError::Conflict(e.to_string()),
            SessionError::Conversation(e) => AppError::Conversation(e),
        }
    }
}

fn conversation_error_response(e: ConversationError) -> (StatusCode, ErrorResponse) {
    let stage = e.stage();
    let kind = e.kind().to_string();
    match e {
        ConversationError::EmptyInput => (
            StatusCode::BAD_REQUEST,
            ErrorResponse {
                stage: Some(stage),
                kind: Some(kind),
                ..ErrorResponse::new("Please describe your symptoms")
            },
        ),
        ConversationError::Gateway {
            source, snapshot, ..
        } => {
            let status = match source.kind {
                LlmErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                LlmErrorKind::Cancelled => StatusCode::CONFLICT,
                _ => StatusCode::BAD_GATEWAY,
            };
            (
                status,
                ErrorResponse {
                    details: Some(source.message),
                    stage: Some(stage),
                    kind: Some(kind),
                    messages: Some(snapshot),
                    ..ErrorResponse::new("Failed to get a reply from the model")
                },
            )
        }
        ConversationError::Validation {
            source, snapshot, ..
        } => (
            StatusCode::BAD_GATEWAY,
            ErrorResponse {
                details: Some(source.to_string()),
                stage: Some(stage),
                kind: Some(kind),
                raw: Some(source.raw),
                messages: Some(snapshot),
                ..ErrorResponse::new("The model reply did not match the expected format")
            },
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::new(msg)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorResponse::new(msg)),
            AppError::Conversation(e) => conversation_error_response(e),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Conversation, ConversationConfig};
    use crate::llm::testing::{DelayedMockLlmService, MockLlmService};
    use crate::llm::{LlmError, LlmService, ModelRegistry};
    use crate::prompt::PromptContract;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    const QUESTION: &str = r#"{"response_type":"question","question":{"text":"How severe is your headache?","type":"numeric"}}"#;

    fn app(mock: Arc<dyn LlmService>) -> Router {
        let conversation = Conversation::new(
            Arc::clone(&mock),
            PromptContract::new("test-v1", "Reply in JSON."),
            ConversationConfig::default(),
        );
        let registry = Arc::new(ModelRegistry::with_service(mock));
        create_router(AppState::new(conversation, registry))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_stateless_chat() {
        let mock = Arc::new(MockLlmService::new("mock"));
        mock.queue_text(QUESTION);
        let app = app(mock);

        let (status, body) = send(
            &app,
            "POST",
            "/api/chat",
            Some(json!({"messages": [], "userInput": "I have a headache and nausea"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"]["response_type"], "question");
        assert_eq!(body["response"]["question"]["options"].as_array().unwrap().len(), 10);
        assert_eq!(body["messages"].as_array().unwrap().len(), 3);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["view"]["kind"], "question");
        assert_eq!(body["view"]["input"], "scale");
    }

    #[tokio::test]
    async fn test_chat_validation_failure() {
        let mock = Arc::new(MockLlmService::new("mock"));
        mock.queue_text(r#"{"response_type":"question"}"#);
        let app = app(mock);

        let (status, body) = send(
            &app,
            "POST",
            "/api/chat",
            Some(json!({"messages": [], "userInput": "headache"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["stage"], "validation");
        assert_eq!(body["kind"], "missing_field");
        assert_eq!(body["raw"], r#"{"response_type":"question"}"#);
        assert_eq!(body["messages"], json!([]));
    }

    #[tokio::test]
    async fn test_chat_rejects_bad_input() {
        let mock = Arc::new(MockLlmService::new("mock"));
        let app = app(mock.clone());

        let (status, body) = send(
            &app,
            "POST",
            "/api/chat",
            Some(json!({"messages": [], "userInput": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "empty_input");

        let (status, _) = send(
            &app,
            "POST",
            "/api/chat",
            Some(json!({"messages": [{"role": "user", "content": "hi"}], "userInput": "more"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(mock.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_chat_gateway_failure_statuses() {
        let mock = Arc::new(MockLlmService::new("mock"));
        mock.queue_error(LlmError::timeout("slow"));
        mock.queue_error(LlmError::rate_limit("slow down").with_status(429));
        let app = app(mock);
        let body = json!({"messages": [], "userInput": "headache"});

        let (status, response) = send(&app, "POST", "/api/chat", Some(body.clone())).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(response["stage"], "gateway");
        assert_eq!(response["kind"], "timeout");

        let (status, response) = send(&app, "POST", "/api/chat", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(response["kind"], "provider_status");
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let mock = Arc::new(MockLlmService::new("mock"));
        mock.queue_text(QUESTION);
        let app = app(mock);

        let (status, body) = send(&app, "POST", "/api/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["session"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["session"]["state"]["type"], "awaiting_user_input");

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/sessions/{id}/chat"),
            Some(json!({"text": "headache"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["messages"].as_array().unwrap().len(), 3);

        let (status, body) = send(&app, "GET", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session"]["user_turns"], 1);
        assert_eq!(body["view"]["kind"], "question");

        let (status, body) = send(&app, "POST", &format!("/api/sessions/{id}/cancel"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], false);

        let (status, _) = send(&app, "DELETE", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, "GET", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains(&id));
    }

    #[tokio::test]
    async fn test_introspection() {
        let app = app(Arc::new(MockLlmService::new("mock")));

        let (status, body) = send(&app, "GET", "/api/models", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["default"], "mock");

        let (status, body) = send(&app, "GET", "/api/prompt", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], "test-v1");
        assert_eq!(body["model"], "mock");
    }

    async fn create_session(app: &Router) -> String {
        let (_, body) = send(app, "POST", "/api/sessions", None).await;
        body["session"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_session_chat_while_pending_is_conflict() {
        let slow = Arc::new(DelayedMockLlmService::new("slow", Duration::from_millis(200)));
        slow.queue_text(QUESTION);
        let app = app(slow);
        let id = create_session(&app).await;
        let uri = format!("/api/sessions/{id}/chat");

        let first = {
            let app = app.clone();
            let uri = uri.clone();
            tokio::spawn(async move { send(&app, "POST", &uri, Some(json!({"text": "headache"}))).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let (status, body) = send(&app, "POST", &uri, Some(json!({"text": "nausea"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("pending"));

        let (status, body) = first.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["messages"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_session_chat_is_conflict() {
        let slow = Arc::new(DelayedMockLlmService::new("slow", Duration::from_secs(30)));
        slow.queue_text(QUESTION);
        let app = app(slow);
        let id = create_session(&app).await;

        let pending = {
            let app = app.clone();
            let uri = format!("/api/sessions/{id}/chat");
            tokio::spawn(async move { send(&app, "POST", &uri, Some(json!({"text": "headache"}))).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let (status, body) = send(&app, "POST", &format!("/api/sessions/{id}/cancel"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);

        let (status, body) = pending.await.unwrap();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["stage"], "gateway");
        assert_eq!(body["kind"], "cancelled");
        assert_eq!(body["messages"], json!([]));

        let (_, body) = send(&app, "GET", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(body["session"]["state"]["type"], "awaiting_user_input");
    }

    #[tokio::test]
    async fn test_session_chat_validation_failure_returns_snapshot() {
        let mock = Arc::new(MockLlmService::new("mock"));
        mock.queue_text(QUESTION);
        mock.queue_text(r#"{"response_type":"assessment","question":{"text":"?","type":"numeric"}}"#);
        let app = app(mock);
        let id = create_session(&app).await;
        let uri = format!("/api/sessions/{id}/chat");

        let (status, first) = send(&app, "POST", &uri, Some(json!({"text": "headache"}))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, "POST", &uri, Some(json!({"text": "8"}))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["stage"], "validation");
        assert_eq!(body["kind"], "unknown_discriminant");
        assert!(body["raw"].as_str().unwrap().contains("assessment"));
        assert_eq!(body["messages"], first["messages"]);

        let (_, body) = send(&app, "GET", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(body["messages"], first["messages"]);
    }
}
