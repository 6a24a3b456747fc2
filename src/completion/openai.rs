use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{CompletionError, CompletionRequest, CompletionService, Message};

/// Configuration for an OpenAI-compatible chat-completions endpoint
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o".to_string(),
            max_tokens: 4096,
            timeout_secs: 60,
        }
    }
}

impl OpenAiConfig {
    /// Read configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            if !base_url.is_empty() {
                config.base_url = base_url;
            }
        }
        config.api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        if let Ok(model) = std::env::var("SEEK_PAGE_MODEL") {
            if !model.is_empty() {
                config.model = model;
            }
        }
        config
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat-completions client. Works against api.openai.com and any server that
/// speaks the same protocol.
pub struct OpenAiCompletion {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiCompletion {
    pub fn new(config: OpenAiConfig) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| CompletionError::Network(err.to_string()))?;

        ::log::info!(
            "Completion backend: {} at {}",
            config.model,
            config.base_url
        );
        Ok(Self { client, config })
    }

    /// Build a client from `OPENAI_API_KEY` / `OPENAI_BASE_URL` /
    /// `SEEK_PAGE_MODEL`
    pub fn from_env() -> Result<Self, CompletionError> {
        Self::new(OpenAiConfig::from_env())
    }
}

#[async_trait]
impl CompletionService for OpenAiCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: &request.messages,
            max_tokens: self.config.max_tokens,
            response_format: request
                .json_mode
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    CompletionError::Timeout
                } else {
                    CompletionError::Network(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => CompletionError::AuthenticationFailed(status.as_u16()),
                429 => CompletionError::RateLimited,
                code => CompletionError::Api { status: code, body },
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|err| CompletionError::Network(err.to_string()))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(CompletionError::EmptyResponse)?;

        ::log::debug!("Completion reply: {} chars", content.len());
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_mode_serializes_response_format() {
        let request = ChatRequest {
            model: "gpt-4o",
            messages: &[Message::user("hi")],
            max_tokens: 4096,
            response_format: Some(ResponseFormat {
                kind: "json_object",
            }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");

        let request = ChatRequest {
            model: "gpt-4o",
            messages: &[],
            max_tokens: 4096,
            response_format: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn test_config_defaults() {
        let config = OpenAiConfig::default();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_tokens, 4096);
        assert_eq!(config.base_url, "https://api.openai.com/v1");
    }
}
