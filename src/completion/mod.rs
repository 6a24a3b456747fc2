pub mod openai;

pub use openai::{OpenAiCompletion, OpenAiConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a chat conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A single completion call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,

    /// Ask the backend for a bare JSON object reply
    pub json_mode: bool,
}

impl CompletionRequest {
    /// Request expecting a JSON object back
    pub fn json(messages: Vec<Message>) -> Self {
        Self {
            messages,
            json_mode: true,
        }
    }

    /// Request expecting free text back
    pub fn text(messages: Vec<Message>) -> Self {
        Self {
            messages,
            json_mode: false,
        }
    }

    /// Extend the conversation with the unusable reply and a corrective
    /// instruction, for one retry after malformed output
    pub fn with_retry_turn(mut self, previous_reply: &str, correction: &str) -> Self {
        self.messages.push(Message::assistant(previous_reply));
        self.messages.push(Message::user(correction));
        self
    }
}

/// Errors surfaced by completion backends
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed (status {0})")]
    AuthenticationFailed(u16),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Reply carried no content")]
    EmptyResponse,
}

/// Anything that can answer a chat completion. The navigator only ever needs
/// the reply text; parsing and validation happen on the caller's side.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let system = Message::system("You are a formatter");
        assert_eq!(system.role, Role::System);
        assert_eq!(system.content, "You are a formatter");

        let user = Message::user("format this");
        assert_eq!(user.role, Role::User);

        let assistant = Message::assistant("done");
        assert_eq!(assistant.role, Role::Assistant);
    }

    #[test]
    fn test_role_wire_names() {
        let message = Message::system("x");
        let json = serde_json::to_string(&message).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"x"}"#);
    }

    #[test]
    fn test_retry_turn_extends_conversation() {
        let request = CompletionRequest::json(vec![
            Message::system("analyze"),
            Message::user("page"),
        ]);
        assert!(request.json_mode);

        let retried = request.with_retry_turn("not json", "reply with JSON only");
        assert_eq!(retried.messages.len(), 4);
        assert_eq!(retried.messages[2].role, Role::Assistant);
        assert_eq!(retried.messages[3].content, "reply with JSON only");
    }
}
