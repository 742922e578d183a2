// src/services/completion_gateway.rs
use async_trait::async_trait;
use reqwest::{
    Client as HttpClient, StatusCode,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::CompletionMessage;

pub const WARNING_MARKER: &str = "⚠️";

/// Result of one upstream call. `Failed` still becomes a chat reply at the
/// HTTP boundary; see [`CompletionOutcome::into_reply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Completed(String),
    Failed(String),
}

impl CompletionOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, CompletionOutcome::Failed(_))
    }

    pub fn into_reply(self) -> String {
        match self {
            CompletionOutcome::Completed(text) => text,
            CompletionOutcome::Failed(reason) => format!("{WARNING_MARKER} Error: {reason}"),
        }
    }
}

impl From<Result<String, CompletionError>> for CompletionOutcome {
    fn from(value: Result<String, CompletionError>) -> Self {
        match value {
            Ok(text) => CompletionOutcome::Completed(text),
            Err(e) => CompletionOutcome::Failed(e.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid API key header: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("couldn't decode response: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("completion service returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("completion service returned no reply text")]
    Empty,
}

/// Text-generation backend. Implementations never return an error; every
/// failure is folded into [`CompletionOutcome::Failed`].
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    async fn complete(&self, messages: &[CompletionMessage]) -> CompletionOutcome;

    /// Whether an upstream credential is present.
    fn is_configured(&self) -> bool;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [CompletionMessage],
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible `chat/completions` endpoint. Non-streaming,
/// no retry; timeouts are whatever the shared `reqwest::Client` applies.
#[derive(Clone)]
pub struct OpenAiGateway {
    api_key: String,
    model: String,
    base: String,
    http: HttpClient,
}

impl std::fmt::Debug for OpenAiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiGateway")
            .field("model", &self.model)
            .field("base", &self.base)
            .finish()
    }
}

impl OpenAiGateway {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::with_http(api_key, model, base_url, HttpClient::new())
    }

    pub fn with_http(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        http: HttpClient,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base: base_url.into(),
            http,
        }
    }

    async fn chat_completion(&self, messages: &[CompletionMessage]) -> Result<String, CompletionError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );

        let url = format!("{}/chat/completions", self.base);
        let resp = self
            .http
            .post(url)
            .headers(headers)
            .json(&ChatCompletionRequest {
                model: &self.model,
                messages,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CompletionError::Api { status, body });
        }

        let bytes = resp.bytes().await?;
        let parsed: ChatCompletionResponse = serde_json::from_slice(&bytes)?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(CompletionError::Empty)
    }
}

#[async_trait]
impl CompletionGateway for OpenAiGateway {
    async fn complete(&self, messages: &[CompletionMessage]) -> CompletionOutcome {
        let result = self.chat_completion(messages).await;
        if let Err(error) = &result {
            tracing::warn!(model = %self.model, %error, "completion call failed");
        }
        result.into()
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Stand-in used when the process runs without a credential (echo mode).
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredGateway;

#[async_trait]
impl CompletionGateway for UnconfiguredGateway {
    async fn complete(&self, _messages: &[CompletionMessage]) -> CompletionOutcome {
        CompletionOutcome::Failed("completion service is not configured".to_string())
    }

    fn is_configured(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_outcome_renders_with_marker() {
        let reply = CompletionOutcome::Failed("quota exceeded".to_string()).into_reply();
        assert_eq!(reply, "⚠️ Error: quota exceeded");
    }

    #[test]
    fn completed_outcome_renders_text_unchanged() {
        let reply = CompletionOutcome::Completed("Hello".to_string()).into_reply();
        assert_eq!(reply, "Hello");
    }

    #[test]
    fn request_serializes_roles_as_strings() {
        let messages = vec![CompletionMessage::system("s"), CompletionMessage::user("u")];
        let body = serde_json::to_value(ChatCompletionRequest {
            model: "gpt-3.5-turbo",
            messages: &messages,
        })
        .unwrap();
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "u");
    }

    #[tokio::test]
    async fn unconfigured_gateway_always_fails() {
        let outcome = UnconfiguredGateway.complete(&[]).await;
        assert!(outcome.is_failed());
        assert!(!UnconfiguredGateway.is_configured());
    }
}
