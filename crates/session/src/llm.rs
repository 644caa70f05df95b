//! Chat-completion provider abstraction and the GitHub Models implementation.

use std::time::Duration;

use async_trait::async_trait;
use proto::{RequestOutcome, Role};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default inference endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://models.github.ai/inference/chat/completions";

/// Delay before a decode failure is reported.
pub const DEFAULT_DECODE_GRACE: Duration = Duration::from_secs(5);

const ACCEPT_GITHUB_JSON: &str = "application/vnd.github+json";

/// One wire message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Semantic role of this message.
    pub role: Role,
    /// Text content.
    pub content: String,
}

impl ChatMessage {
    /// Creates a system-role message with the given content.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Creates a user-role message with the given content.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant-role message with the given content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Request body sent to the completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Target model id.
    pub model: String,
    /// System instruction, prior turns, then the latest user utterance.
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// Assembles a request from its parts.
    pub fn build(
        model: impl Into<String>,
        system_instruction: &str,
        history: &[ChatMessage],
        utterance: impl Into<String>,
    ) -> Self {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system_instruction));
        messages.extend_from_slice(history);
        messages.push(ChatMessage::user(utterance));
        Self {
            model: model.into(),
            messages,
        }
    }
}

// ── Response types ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ChatResponse {
    id: String,
    object: String,
    model: String,
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ChatChoice {
    index: u32,
    finish_reason: Option<String>,
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ResponseMessage {
    role: String,
    content: Option<String>,
}

/// Completion provider trait.
///
/// Every call yields exactly one classified outcome; implementations never
/// retry and own no timeout.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Sends one request and classifies the result.
    async fn send(&self, req: ChatRequest) -> RequestOutcome;
}

/// GitHub Models inference provider (OpenAI-compatible chat completions).
pub struct GithubModelsProvider {
    client: reqwest::Client,
    token: String,
    endpoint: String,
    decode_grace: Duration,
}

impl GithubModelsProvider {
    /// Creates a provider targeting the default endpoint.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_endpoint(token, DEFAULT_ENDPOINT)
    }

    /// Creates a provider targeting a custom endpoint (useful for proxies/tests).
    pub fn with_endpoint(token: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.into(),
            endpoint: endpoint.into(),
            decode_grace: DEFAULT_DECODE_GRACE,
        }
    }

    /// Overrides the delay applied before reporting a decode failure.
    pub fn with_decode_grace(mut self, grace: Duration) -> Self {
        self.decode_grace = grace;
        self
    }

    /// Configured endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionProvider for GithubModelsProvider {
    async fn send(&self, req: ChatRequest) -> RequestOutcome {
        debug!(
            model = %req.model,
            messages = %req.messages.len(),
            endpoint = %self.endpoint,
            "Sending chat completion request"
        );

        let response = match self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, ACCEPT_GITHUB_JSON)
            .json(&req)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Chat completion request failed");
                return RequestOutcome::NetworkError {
                    description: e.to_string(),
                };
            }
        };

        let status = response.status().as_u16();
        debug!(status, "Chat completion response received");

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(status, error = %e, "Failed to read response body");
                return RequestOutcome::NetworkError {
                    description: e.to_string(),
                };
            }
        };

        match classify_body(status, body) {
            outcome @ RequestOutcome::ServerDecodeError { .. } => {
                if !self.decode_grace.is_zero() {
                    tokio::time::sleep(self.decode_grace).await;
                }
                outcome
            }
            outcome => outcome,
        }
    }
}

/// Classifies a fully read response body.
fn classify_body(status: u16, body: String) -> RequestOutcome {
    let decoded: ChatResponse = match serde_json::from_str(&body) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(
                status,
                error = %e,
                body = %body.chars().take(200).collect::<String>(),
                "Chat completion response did not decode"
            );
            return RequestOutcome::ServerDecodeError {
                status,
                raw_body: body,
                description: e.to_string(),
            };
        }
    };

    let content = decoded
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty());

    match content {
        Some(content) => RequestOutcome::Success { content },
        None => {
            debug!(status, "Chat completion carried no reply content");
            RequestOutcome::EmptyReply
        }
    }
}
