//! Property-based tests for the `OpenAI` translation layer
//!
//! - Message order and content survive translation
//! - Every translated message carries a known role
//! - A single text choice normalizes to exactly its text

use super::openai::{OpenAIChoice, OpenAIMessage, OpenAIResponse, OpenAIService, OpenAIUsage};
use super::types::{LlmMessage, MessageRole};
use proptest::prelude::*;

fn arb_message() -> impl Strategy<Value = LlmMessage> {
    (
        prop_oneof![
            Just(MessageRole::System),
            Just(MessageRole::User),
            Just(MessageRole::Assistant),
        ],
        "[a-zA-Z0-9 _.!?,{}\":]{0,80}",
    )
        .prop_map(|(role, content)| LlmMessage { role, content })
}

fn make_response(content: String, finish_reason: &str) -> OpenAIResponse {
    OpenAIResponse {
        choices: vec![OpenAIChoice {
            message: OpenAIMessage {
                role: "assistant".to_string(),
                content: Some(content),
                refusal: None,
            },
            finish_reason: Some(finish_reason.to_string()),
        }],
        usage: Some(OpenAIUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
    }
}

proptest! {
    #[test]
    fn prop_translation_preserves_order(messages in proptest::collection::vec(arb_message(), 1..10)) {
        let translated: Vec<OpenAIMessage> =
            messages.iter().map(super::openai::translate_message).collect();

        prop_assert_eq!(translated.len(), messages.len());
        for (out, msg) in translated.iter().zip(&messages) {
            prop_assert!(matches!(out.role.as_str(), "system" | "user" | "assistant"));
            prop_assert_eq!(out.content.as_deref(), Some(msg.content.as_str()));
        }
    }

    #[test]
    fn prop_normalize_keeps_text(
        text in "[a-zA-Z0-9 {}\":,]{0,100}",
        finish in prop_oneof![Just("stop"), Just("length")],
    ) {
        let normalized = OpenAIService::normalize_response(make_response(text.clone(), finish)).unwrap();
        prop_assert_eq!(normalized.end_turn, finish == "stop");
        prop_assert_eq!(normalized.text, text);
    }
}
