//! Test doubles shared by the integration tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use fixloop::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError};
use fixloop::sandbox::{ExecutionResult, Sandbox};

/// Replies from a queue, then repeats the fallback.
#[derive(Default)]
pub struct ReplayLlm {
    replies: Mutex<VecDeque<String>>,
    fallback: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ReplayLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn always(content: impl Into<String>) -> Self {
        Self {
            fallback: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(content.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ReplayLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request);
        let next = self.replies.lock().unwrap().pop_front();
        next.or_else(|| self.fallback.clone())
            .map(CompletionResponse::text)
            .ok_or_else(|| LlmError::InvalidResponse("no reply queued".to_string()))
    }

    fn model(&self) -> &str {
        "replay"
    }
}

/// Returns queued results, then the fallback, recording the file it ran.
pub struct ReplaySandbox {
    results: Mutex<VecDeque<ExecutionResult>>,
    fallback: ExecutionResult,
    sources: Mutex<Vec<String>>,
}

impl ReplaySandbox {
    pub fn always(result: ExecutionResult) -> Self {
        Self {
            results: Mutex::new(VecDeque::new()),
            fallback: result,
            sources: Mutex::new(Vec::new()),
        }
    }

    pub fn with_result(self, result: ExecutionResult) -> Self {
        self.results.lock().unwrap().push_back(result);
        self
    }

    pub fn execution_count(&self) -> usize {
        self.sources.lock().unwrap().len()
    }

    pub fn seen_sources(&self) -> Vec<String> {
        self.sources.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sandbox for ReplaySandbox {
    async fn execute(&self, file_path: &Path, _language: &str) -> ExecutionResult {
        let Ok(source) = tokio::fs::read_to_string(file_path).await else {
            return ExecutionResult::setup_failure(format!("Error: File not found at {}", file_path.display()));
        };
        self.sources.lock().unwrap().push(source);
        let next = self.results.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}
