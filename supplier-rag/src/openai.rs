//! OpenAI-compatible chat-completions client.
//!
//! Targets Groq's OpenAI-compatible endpoint by default; any service that
//! speaks the `/chat/completions` protocol works via
//! [`with_base_url`](OpenAICompatibleClient::with_base_url).
//!
//! This module is only available when the `openai` feature is enabled.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::llm::{ChatRequest, ChatResponse, ChatService};

/// Groq's OpenAI-compatible API base.
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Environment variable read by [`OpenAICompatibleClient::from_env`].
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

const PROVIDER: &str = "OpenAI-compatible";

/// A [`ChatService`] backed by an OpenAI-compatible HTTP API.
///
/// Uses `reqwest` to call `{base_url}/chat/completions` directly. The
/// client is cheap to clone and safe to share across concurrent queries.
///
/// # Example
///
/// ```rust,ignore
/// use supplier_rag::openai::OpenAICompatibleClient;
///
/// let client = OpenAICompatibleClient::from_env()?;
/// ```
#[derive(Clone)]
pub struct OpenAICompatibleClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for OpenAICompatibleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAICompatibleClient").field("base_url", &self.base_url).finish()
    }
}

impl OpenAICompatibleClient {
    /// Create a client for Groq with the given API key.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::Config("API key must not be empty".into()));
        }
        Ok(Self { client: reqwest::Client::new(), api_key, base_url: GROQ_API_BASE.into() })
    }

    /// Create a client using the `GROQ_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| RagError::Config(format!("{API_KEY_ENV} environment variable not set")))?;
        Self::new(api_key)
    }

    /// Point the client at another OpenAI-compatible API base.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Describe a non-2xx response: the provider's `error.message` when the body
/// carries one, otherwise the raw body or the reason it could not be read.
fn error_detail<E: std::fmt::Display>(body: std::result::Result<String, E>) -> String {
    match body {
        Ok(body) => match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(parsed) => parsed.error.message,
            Err(_) if body.trim().is_empty() => "empty response body".to_string(),
            Err(_) => body,
        },
        Err(e) => format!("could not read response body: {e}"),
    }
}

#[async_trait]
impl ChatService for OpenAICompatibleClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        debug!(provider = PROVIDER, model = %request.model, "posting chat completion");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                RagError::upstream(PROVIDER, format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = error_detail(response.text().await);

            error!(provider = PROVIDER, %status, "API error");
            return Err(RagError::upstream(PROVIDER, format!("API returned {status}: {detail}")));
        }

        response.json::<ChatResponse>().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::upstream(PROVIDER, format!("failed to parse response: {e}"))
        })
    }
}
