//! Scripted completion client for tests.
//!
//! Each call to `complete` pops the next scripted reply. Every request is
//! recorded so tests can assert on the prompts that were sent.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use itt_core::{AppError, AppResult};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A scripted reply: generated text or a provider failure message.
type Reply = Result<String, String>;

pub struct MockLlmClient {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    /// Client answering with `replies` in order.
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Client whose next call fails with `AppError::Llm(message)`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err(message.into())])),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of completions requested so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlmClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let reply = self
            .replies
            .lock()
            .map_err(|_| AppError::Llm("mock client poisoned".to_string()))?
            .pop_front()
            .ok_or_else(|| AppError::Llm("mock client has no scripted reply left".to_string()))?;

        let content = reply.map_err(AppError::Llm)?;
        Ok(LlmResponse {
            usage: LlmUsage::new(0, 0),
            model: request.model.clone(),
            content,
            finish_reason: Some("STOP".to_string()),
        })
    }
}
