//! Completion and document summarization over an OpenAI-compatible
//! chat-completions API

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::LlmSettings;
use crate::types::{ServiceError, ServiceResult};

/// System instruction for document questions
const SUMMARY_SYSTEM_PROMPT: &str = "You are an assistant summarizing a document.";

/// Completion capability used by the dispatcher
pub trait CompletionBackend {
    /// Forward `prompt` verbatim and return the model's text
    fn complete(&self, prompt: &str, max_tokens: u32) -> ServiceResult;

    /// Answer `question` about `document_text`
    fn summarize(&self, document_text: &str, question: &str) -> ServiceResult;
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request body for `/chat/completions`
#[derive(Serialize, Debug)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ============================================================================
// Response Handling
// ============================================================================

/// Pull `choices[0].message.content` out of a success body
pub fn parse_chat_response(body: &str) -> ServiceResult {
    let resp: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ServiceError::MalformedResponse(format!("invalid completion JSON: {}", e)))?;

    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|text| text.trim().to_string())
        .ok_or_else(|| ServiceError::MalformedResponse("missing choices[0].message.content".to_string()))
}

/// Best-effort message from an error body: `error.message`, then `message`
pub fn backend_error_message(body: &str) -> String {
    let json: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return "Unknown error".to_string(),
    };

    json.get("error")
        .and_then(|e| e.get("message"))
        .or_else(|| json.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| "Unknown error".to_string())
}

/// Turn a chat-completions response into text or a typed error.
/// `context` prefixes the backend's message on non-success statuses.
pub fn interpret_chat_response(status: StatusCode, body: &str, context: &str) -> ServiceResult {
    if !status.is_success() {
        let message = backend_error_message(body);
        tracing::warn!(status = status.as_u16(), "LLM error: {}", message);
        return Err(ServiceError::backend(context, status.as_u16(), message));
    }

    parse_chat_response(body)
}

/// The user message sent with a document question
pub fn summary_prompt(document_text: &str, question: &str) -> String {
    format!(
        "Summarize the following text:\n{}\nBased on the document, answer the question: {}",
        document_text, question
    )
}

// ============================================================================
// Client
// ============================================================================

/// Chat-completions client (OpenRouter by default)
pub struct CompletionClient {
    client: Client,
    settings: LlmSettings,
    api_key: String,
}

impl CompletionClient {
    pub fn new(client: Client, settings: LlmSettings, api_key: impl Into<String>) -> Self {
        Self {
            client,
            settings,
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    /// POST one chat request; `context` prefixes non-success messages
    fn send(&self, request: &ChatRequest, context: &str) -> ServiceResult {
        tracing::debug!(model = %request.model, "Calling LLM at {}", self.endpoint());

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()?;

        let status = response.status();
        let body = response.text()?;

        interpret_chat_response(status, &body, context)
    }
}

impl CompletionBackend for CompletionClient {
    fn complete(&self, prompt: &str, max_tokens: u32) -> ServiceResult {
        let request = ChatRequest {
            model: self.settings.completion_model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            max_tokens,
        };
        self.send(&request, "Error during completion")
    }

    fn summarize(&self, document_text: &str, question: &str) -> ServiceResult {
        let request = ChatRequest {
            model: self.settings.summary_model.clone(),
            messages: vec![
                ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
                ChatMessage::user(summary_prompt(document_text, question)),
            ],
            max_tokens: self.settings.summary_max_tokens,
        };
        self.send(&request, "Error during summarization")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Direct client for tests that target a closed local port
    fn local_client() -> Client {
        Client::builder().no_proxy().build().unwrap()
    }

    fn unreachable_client() -> CompletionClient {
        let settings = LlmSettings {
            base_url: "http://127.0.0.1:9/v1".to_string(),
            ..Default::default()
        };
        CompletionClient::new(local_client(), settings, "test-key")
    }

    #[test]
    fn test_parse_chat_response() {
        let body = serde_json::json!({
            "id": "gen-1",
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": "  Hello there.\n" } }
            ]
        })
        .to_string();
        assert_eq!(parse_chat_response(&body).unwrap(), "Hello there.");
    }

    #[test]
    fn test_parse_chat_response_no_choices() {
        let body = serde_json::json!({ "choices": [] }).to_string();
        assert!(matches!(
            parse_chat_response(&body),
            Err(ServiceError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_chat_response_not_json() {
        assert!(matches!(
            parse_chat_response("<html>gateway timeout</html>"),
            Err(ServiceError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_backend_error_message_variants() {
        let nested = serde_json::json!({ "error": { "message": "Rate limit exceeded", "code": 429 } });
        assert_eq!(backend_error_message(&nested.to_string()), "Rate limit exceeded");

        let flat = serde_json::json!({ "message": "No auth credentials found" });
        assert_eq!(backend_error_message(&flat.to_string()), "No auth credentials found");

        assert_eq!(backend_error_message("not json"), "Unknown error");
        assert_eq!(backend_error_message("{}"), "Unknown error");
    }

    #[test]
    fn test_summarization_failure_carries_backend_message() {
        let body = serde_json::json!({ "error": { "message": "Insufficient credits", "code": 402 } });
        let err = interpret_chat_response(
            StatusCode::PAYMENT_REQUIRED,
            &body.to_string(),
            "Error during summarization",
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Backend { status: 402, .. }));
        assert_eq!(err.to_string(), "Error during summarization: Insufficient credits");
    }

    #[test]
    fn test_interpret_chat_response_success() {
        let body = serde_json::json!({ "choices": [{ "message": { "content": "pong" } }] });
        let text = interpret_chat_response(StatusCode::OK, &body.to_string(), "unused").unwrap();
        assert_eq!(text, "pong");
    }

    #[test]
    fn test_summary_prompt_embeds_document_and_question() {
        let prompt = summary_prompt("Chapter 1. Ownership.", "What is chapter 1 about?");
        assert!(prompt.starts_with("Summarize the following text:\nChapter 1. Ownership.\n"));
        assert!(prompt.ends_with("answer the question: What is chapter 1 about?"));
    }

    #[test]
    fn test_chat_request_wire_shape() {
        let request = ChatRequest {
            model: "openai/gpt-4o".to_string(),
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
            max_tokens: 500,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "openai/gpt-4o");
        assert_eq!(json["max_tokens"], 500);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let settings = LlmSettings {
            base_url: "https://openrouter.ai/api/v1/".to_string(),
            ..Default::default()
        };
        let client = CompletionClient::new(Client::new(), settings, "k");
        assert_eq!(client.endpoint(), "https://openrouter.ai/api/v1/chat/completions");
    }

    #[test]
    fn test_network_failure_is_error_not_panic() {
        let result = unreachable_client().complete("hello", 10);
        assert!(matches!(result, Err(ServiceError::Network(_))));
    }

    /// Live check against OpenRouter
    /// Run with: OPENROUTER_API_KEY=... cargo test test_openrouter_live -- --ignored
    #[test]
    #[ignore]
    fn test_openrouter_live() {
        let key = std::env::var(crate::config::LLM_API_KEY_VAR).unwrap();
        let client = CompletionClient::new(Client::new(), LlmSettings::default(), key);
        let answer = client.complete("Reply with the single word: pong", 10).unwrap();
        assert!(!answer.is_empty());
    }
}
