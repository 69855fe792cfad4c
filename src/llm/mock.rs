//! Scripted client for unit tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use super::client::{LlmClient, LlmError};
use super::types::{CompletionRequest, CompletionResponse};

/// Replies are popped in order and every request is recorded.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    calls: AtomicU32,
    fallback: Option<String>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `content` whenever the script is empty.
    pub fn always(content: impl Into<String>) -> Self {
        Self {
            fallback: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.push(Ok(content.into()));
        self
    }

    /// Queue a failure surfaced as [`LlmError::ApiError`].
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.push(Err(message.into()));
        self
    }

    fn push(&self, reply: Result<String, String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let next = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        match next.or_else(|| self.fallback.clone().map(Ok)) {
            Some(Ok(content)) => Ok(CompletionResponse::text(content)),
            Some(Err(message)) => Err(LlmError::ApiError { status: 500, message }),
            None => Err(LlmError::InvalidResponse("no scripted reply".to_string())),
        }
    }

    fn model(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_script_in_order() {
        let mock = MockLlmClient::new().with_response("first").with_error("down");

        let first = mock.complete(CompletionRequest::new("s")).await.unwrap();
        assert_eq!(first.content, "first");
        assert!(mock.complete(CompletionRequest::new("s")).await.is_err());
        assert!(matches!(
            mock.complete(CompletionRequest::new("s")).await,
            Err(LlmError::InvalidResponse(_))
        ));
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_mock_fallback() {
        let mock = MockLlmClient::always("same");
        for _ in 0..3 {
            let response = mock.complete(CompletionRequest::new("s")).await.unwrap();
            assert_eq!(response.content, "same");
        }
        assert_eq!(mock.call_count(), 3);
    }
}
