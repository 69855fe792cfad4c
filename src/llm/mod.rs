//! LLM Client Layer - provider-neutral completion calls
//!
//! This module provides:
//! - Message types for LLM communication
//! - LlmClient trait for API abstraction
//! - Anthropic and Gemini implementations
//! - ProviderClient, selected from configuration
//! - MockLlmClient for unit tests

pub mod anthropic;
pub mod client;
pub mod gemini;
#[cfg(test)]
mod mock;
pub mod provider;
pub mod types;

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use client::{LlmClient, LlmError};
pub use gemini::{GeminiClient, GeminiConfig};
#[cfg(test)]
pub use mock::MockLlmClient;
pub use provider::ProviderClient;
pub use types::{CompletionRequest, CompletionResponse, FinishReason, Message, Role, Usage};
