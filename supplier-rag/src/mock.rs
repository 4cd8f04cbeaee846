//! Scripted [`ChatService`] for tests and offline runs.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{RagError, Result};
use crate::llm::{ChatRequest, ChatResponse, ChatService};

/// A [`ChatService`] that replays scripted outcomes in order and records
/// every request it receives.
///
/// # Example
///
/// ```rust,ignore
/// use supplier_rag::{ChatResponse, MockChatService};
///
/// let mock = MockChatService::new()
///     .with_response(ChatResponse::text("Supplier A is high risk", 10, 5))
///     .with_response(ChatResponse::text(r#"{"Relevance":"RELEVANT","Explanation":"ok"}"#, 8, 4));
/// ```
#[derive(Debug, Default)]
pub struct MockChatService {
    script: Mutex<VecDeque<std::result::Result<ChatResponse, String>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockChatService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    pub fn with_response(self, response: ChatResponse) -> Self {
        lock(&self.script).push_back(Ok(response));
        self
    }

    /// Queue a service failure with the given message.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        lock(&self.script).push_back(Err(message.into()));
        self
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ChatRequest> {
        lock(&self.requests).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl ChatService for MockChatService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        lock(&self.requests).push(request);
        match lock(&self.script).pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(RagError::upstream("mock", message)),
            None => Err(RagError::upstream("mock", "no scripted response left")),
        }
    }
}
