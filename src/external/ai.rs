//! OpenAI-compatible chat completion client.
//!
//! Works with OpenAI or any service implementing the chat completions API
//! (OpenRouter, Together AI, vLLM, local gateways).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AiConfig;
use crate::error::{AppError, AppResult};

const SERVICE: &str = "openai";

/// One chat completion exchange: a system prompt framing the assistant and a
/// user prompt carrying the actual request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: Option<f32>,
}

/// Minimal completion interface the generation job depends on, so tests can
/// substitute a scripted fake.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Sends one chat completion request and returns the assistant text.
    async fn complete(&self, request: CompletionRequest) -> AppResult<String>;
}

pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_output_tokens: u32,
}

impl OpenAiClient {
    pub fn new(config: &AiConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::ExternalApi {
                service: SERVICE.to_string(),
                source: anyhow::Error::from(e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_output_tokens: config.max_output_tokens,
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> AppResult<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: Some(self.max_output_tokens),
        };

        debug!(model = %self.model, "sending chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi {
                service: SERVICE.to_string(),
                source: anyhow::Error::from(e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi {
                service: SERVICE.to_string(),
                source: anyhow::anyhow!("chat completion returned {status}: {text}"),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| AppError::ExternalApi {
            service: SERVICE.to_string(),
            source: anyhow::Error::from(e),
        })?;

        first_choice_text(parsed)
    }
}

fn first_choice_text(response: ChatResponse) -> AppResult<String> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AppError::ExternalApi {
            service: SERVICE.to_string(),
            source: anyhow::anyhow!("chat completion response contained no choices"),
        })?;

    Ok(choice.message.content.unwrap_or_default())
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_skips_absent_fields() {
        let request = ChatRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
            temperature: None,
            max_tokens: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("temperature").is_none());
        assert!(json.get("max_tokens").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_chat_response_parsing() {
        let json = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [
                {
                    "index": 0,
                    "message": {"role": "assistant", "content": "Sing a song."},
                    "finish_reason": "stop"
                }
            ],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
        }"#;

        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        let text = first_choice_text(parsed).unwrap();
        assert_eq!(text, "Sing a song.");
    }

    #[test]
    fn test_empty_choices_is_an_error() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let err = first_choice_text(parsed).unwrap_err();
        assert!(matches!(err, AppError::ExternalApi { .. }));
    }

    #[test]
    fn test_missing_content_becomes_empty_string() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"role": "assistant"}}]}"#).unwrap();
        assert_eq!(first_choice_text(parsed).unwrap(), "");
    }
}
