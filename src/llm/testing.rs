//! Mock implementations for testing
//!
//! These mocks enable controller and API tests without network I/O.

use super::{LlmError, LlmRequest, LlmResponse, LlmService, Usage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Successful response carrying `text`
pub fn mock_response(text: impl Into<String>) -> LlmResponse {
    LlmResponse {
        text: text.into(),
        end_turn: true,
        usage: Usage {
            input_tokens: 10,
            output_tokens: 5,
        },
    }
}

// ============================================================================
// Mock LLM Service
// ============================================================================

/// Mock LLM service that returns queued responses
pub struct MockLlmService {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmService {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a raw reply text
    pub fn queue_text(&self, text: impl Into<String>) {
        self.queue_response(mock_response(text));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Delayed Mock LLM Service (for cancellation and timeout testing)
// ============================================================================

/// Mock LLM service that sleeps before answering
pub struct DelayedMockLlmService {
    inner: MockLlmService,
    delay: Duration,
}

impl DelayedMockLlmService {
    pub fn new(model_id: impl Into<String>, delay: Duration) -> Self {
        Self {
            inner: MockLlmService::new(model_id),
            delay,
        }
    }

    pub fn queue_text(&self, text: impl Into<String>) {
        self.inner.queue_text(text);
    }
}

#[async_trait]
impl LlmService for DelayedMockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        tokio::time::sleep(self.delay).await;
        self.inner.complete(request).await
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmMessage, ResponseFormat};

    #[tokio::test]
    async fn test_mock_llm_service() {
        let mock = MockLlmService::new("test-model");
        mock.queue_text("Hello");

        let request = LlmRequest {
            messages: vec![LlmMessage::user("hi")],
            response_format: ResponseFormat::Text,
            max_tokens: Some(100),
            temperature: None,
        };

        let response = mock.complete(&request).await.unwrap();
        assert_eq!(response.text, "Hello");
        assert!(response.end_turn);

        // Second call should fail (no more responses)
        assert!(mock.complete(&request).await.is_err());
        assert_eq!(mock.recorded_requests().len(), 2);
    }
}
