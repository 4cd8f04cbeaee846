//! Completion-service seam and the answer [`Generator`].
//!
//! [`ChatService`] is the black-box LLM capability: it ships a request and
//! hands back whatever the provider returned. [`Generator`] sits on top and
//! enforces that a response carries an answer and a complete usage triple
//! before anything downstream sees it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{RagError, Result};

/// Token counts consumed by one completion call.
///
/// Constructed through [`TokenUsage::new`] or [`TokenUsage::from_reported`],
/// so `total_tokens == prompt_tokens + completion_tokens` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// The total saturates at `u64::MAX`.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }

    /// Accept a provider-reported triple, re-deriving the total when it
    /// disagrees with the two parts.
    pub fn from_reported(prompt_tokens: u64, completion_tokens: u64, total_tokens: u64) -> Self {
        let usage = Self::new(prompt_tokens, completion_tokens);
        if usage.total_tokens != total_tokens {
            warn!(
                prompt_tokens,
                completion_tokens,
                reported_total = total_tokens,
                "provider total_tokens disagrees with prompt + completion; using the sum"
            );
        }
        usage
    }
}

/// Answer text plus the usage it cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub answer: String,
    pub usage: TokenUsage,
}

// ── Chat-completions wire types ───────────────────────────────────

/// One chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// A chat-completions request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// A request carrying `prompt` as its only, user-role message.
    pub fn single_user(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self { model: model.into(), messages: vec![ChatMessage::user(prompt)] }
    }
}

/// A chat-completions response as received. Every field is optional so a
/// malformed response can be told apart from an empty one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatUsage {
    #[serde(default)]
    pub prompt_tokens: Option<u64>,
    #[serde(default)]
    pub completion_tokens: Option<u64>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
}

impl ChatResponse {
    /// A well-formed response with one answer and a consistent usage triple.
    pub fn text(answer: impl Into<String>, prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            choices: vec![ChatChoice {
                message: Some(ChatChoiceMessage { content: Some(answer.into()) }),
            }],
            usage: Some(ChatUsage {
                prompt_tokens: Some(prompt_tokens),
                completion_tokens: Some(completion_tokens),
                total_tokens: Some(prompt_tokens + completion_tokens),
            }),
        }
    }
}

/// An LLM chat-completion capability.
///
/// Implementations make exactly one attempt per call; retries, if wanted,
/// belong in a wrapper implementing this same trait.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Send one request and return the raw response.
    ///
    /// Transport, authentication, and rate-limit failures are reported as
    /// [`RagError::Upstream`].
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;
}

/// Sends prompts to a [`ChatService`] and validates what comes back.
#[derive(Clone)]
pub struct Generator {
    service: Arc<dyn ChatService>,
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator").field("service", &self.service.name()).finish()
    }
}

impl Generator {
    pub fn new(service: Arc<dyn ChatService>) -> Self {
        Self { service }
    }

    /// Complete `prompt` with `model` as a single user-role message.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Upstream`] if the call fails or the response is
    /// missing the answer text or any of the three usage counts.
    pub async fn complete(&self, prompt: &str, model: &str) -> Result<GenerationResult> {
        let provider = self.service.name().to_string();
        debug!(provider = %provider, model, prompt_len = prompt.len(), "sending completion request");

        let response =
            self.service.chat(ChatRequest::single_user(model, prompt)).await.map_err(|e| {
                error!(provider = %provider, model, error = %e, "completion request failed");
                e
            })?;

        let result = validate(response).map_err(|message| {
            error!(provider = %provider, model, %message, "malformed completion response");
            RagError::upstream(provider.clone(), message)
        })?;

        debug!(
            provider = %provider,
            model,
            prompt_tokens = result.usage.prompt_tokens,
            completion_tokens = result.usage.completion_tokens,
            "completion received"
        );
        Ok(result)
    }
}

fn validate(response: ChatResponse) -> std::result::Result<GenerationResult, String> {
    let answer = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or_else(|| "response has no answer text".to_string())?;

    let usage = response.usage.ok_or_else(|| "response has no usage object".to_string())?;
    let field = |value: Option<u64>, name: &str| {
        value.ok_or_else(|| format!("response usage is missing {name}"))
    };
    let prompt_tokens = field(usage.prompt_tokens, "prompt_tokens")?;
    let completion_tokens = field(usage.completion_tokens, "completion_tokens")?;
    let total_tokens = field(usage.total_tokens, "total_tokens")?;
    if prompt_tokens.checked_add(completion_tokens).is_none() {
        return Err("token usage overflows u64".to_string());
    }

    Ok(GenerationResult {
        answer,
        usage: TokenUsage::from_reported(prompt_tokens, completion_tokens, total_tokens),
    })
}
