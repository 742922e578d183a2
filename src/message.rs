// src/message.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

pub const ANONYMOUS_CLIENT: &str = "anonymous";

/// Inbound `/chat` body as sent over the wire. Every historical field name is
/// accepted here and collapsed by [`RawChatRequest::normalize`].
#[derive(Debug, Default, Deserialize)]
pub struct RawChatRequest {
    #[serde(default)]
    pub client_id: Option<Value>,
    pub prompt: Option<String>,
    pub message: Option<String>,
    pub input: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub meta: Option<Map<String, Value>>,
    #[serde(default)]
    pub history: Option<Vec<Value>>,
}

/// A validated chat request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub client_id: String,
    pub message: String,
    pub meta: Map<String, Value>,
    pub history: Vec<Value>,
}

impl RawChatRequest {
    /// Parses a raw body. Malformed JSON or a non-object body is a client fault.
    pub fn from_slice(body: &[u8]) -> Result<Self, AppError> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn normalize(self) -> Result<ChatRequest, AppError> {
        let message = [self.prompt, self.message, self.input, self.text]
            .into_iter()
            .flatten()
            .map(|m| m.trim().to_string())
            .find(|m| !m.is_empty())
            .ok_or_else(|| AppError::BadRequest("Message cannot be empty".to_string()))?;

        let client_id = client_id_text(self.client_id)?
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string());

        Ok(ChatRequest {
            client_id,
            message,
            meta: self.meta.unwrap_or_default(),
            history: self.history.unwrap_or_default(),
        })
    }
}

/// Scalar ids (`42`, `true`) are used as their JSON text and simply fail to
/// match a directory entry. Objects and arrays are rejected.
fn client_id_text(raw: Option<Value>) -> Result<Option<String>, AppError> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(v.to_string())),
        Some(_) => Err(AppError::BadRequest("client_id must be a string".to_string())),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Speaker of a [`CompletionMessage`]. History is only shape-checked, so roles
/// outside the known three pass through as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    System,
    User,
    Assistant,
    Other(String),
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "system" => Role::System,
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => Role::Other(value),
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::from(value.to_string())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        match value {
            Role::System => "system".to_string(),
            Role::User => "user".to_string(),
            Role::Assistant => "assistant".to_string(),
            Role::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMessage {
    pub role: Role,
    pub content: String,
}

impl CompletionMessage {
    pub fn new(role: impl Into<Role>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}
