//! Client selection from configuration

use async_trait::async_trait;
use std::time::Duration;

use super::anthropic::{AnthropicClient, AnthropicConfig};
use super::client::{LlmClient, LlmError};
use super::gemini::{GeminiClient, GeminiConfig};
use super::types::{CompletionRequest, CompletionResponse};
use crate::config::{LlmConfig, LlmProvider};

/// The configured backend.
#[derive(Debug)]
pub enum ProviderClient {
    Anthropic(AnthropicClient),
    Gemini(GeminiClient),
    /// No usable backend; every call fails with [`LlmError::Unavailable`].
    Unavailable { model: String, reason: String },
}

impl ProviderClient {
    /// Build the client named by `llm.provider`, reading its API key from the
    /// environment.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = match config.provider {
            LlmProvider::Anthropic => ProviderClient::Anthropic(AnthropicClient::new(AnthropicConfig {
                model: config.model.clone(),
                max_tokens: config.max_tokens,
                timeout,
            })?),
            LlmProvider::Gemini => ProviderClient::Gemini(GeminiClient::new(GeminiConfig {
                model: config.model.clone(),
                max_tokens: config.max_tokens,
                timeout,
            })?),
        };
        log::info!("Using {:?} model {}", config.provider, client.model());
        Ok(client)
    }

    /// Like [`ProviderClient::from_config`], but a construction failure
    /// (typically a missing API key) yields an unavailable client instead.
    /// Scripts that already run cleanly never need the model.
    pub fn from_config_lenient(config: &LlmConfig) -> Self {
        Self::from_config(config).unwrap_or_else(|e| {
            log::warn!("LLM client unavailable: {}", e);
            ProviderClient::Unavailable {
                model: config.model.clone(),
                reason: e.to_string(),
            }
        })
    }
}

#[async_trait]
impl LlmClient for ProviderClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        match self {
            ProviderClient::Anthropic(c) => c.complete(request).await,
            ProviderClient::Gemini(c) => c.complete(request).await,
            ProviderClient::Unavailable { reason, .. } => Err(LlmError::Unavailable(reason.clone())),
        }
    }

    fn model(&self) -> &str {
        match self {
            ProviderClient::Anthropic(c) => c.model(),
            ProviderClient::Gemini(c) => c.model(),
            ProviderClient::Unavailable { model, .. } => model,
        }
    }

    fn is_ready(&self) -> bool {
        match self {
            ProviderClient::Anthropic(c) => c.is_ready(),
            ProviderClient::Gemini(c) => c.is_ready(),
            ProviderClient::Unavailable { .. } => false,
        }
    }
}
