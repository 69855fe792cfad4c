//! Fix Proposer - ask the model for a corrected source, through a cache
//!
//! Every failure (model, prompt, parse) folds into `None`; cache failures are
//! logged and treated as a miss.

mod candidate;
mod key;

pub use candidate::{FixCandidate, parse_response, strip_fences};
pub use key::cache_key;

use std::sync::Arc;

use crate::diagnose::ErrorRecord;
use crate::language::{Language, LanguageRegistry};
use crate::llm::{CompletionRequest, FinishReason, LlmClient};
use crate::prompt::FixPrompt;
use crate::store::FixCache;

pub struct FixProposer<L: LlmClient> {
    llm: Arc<L>,
    cache: Arc<dyn FixCache>,
    registry: Arc<LanguageRegistry>,
    prompt: FixPrompt,
}

impl<L: LlmClient> FixProposer<L> {
    pub fn new(llm: Arc<L>, cache: Arc<dyn FixCache>, registry: Arc<LanguageRegistry>, prompt: FixPrompt) -> Self {
        Self {
            llm,
            cache,
            registry,
            prompt,
        }
    }

    /// Propose a replacement for `source` that addresses `record`.
    pub async fn propose(&self, source: &str, record: &ErrorRecord, language: Language) -> Option<FixCandidate> {
        let Some(profile) = self.registry.get(language) else {
            log::warn!("No profile registered for {}", language);
            return None;
        };

        let key = cache_key(source, record, language.tag());
        match self.cache.get(&key) {
            Ok(Some(candidate)) => {
                log::info!("Fix cache hit {}", &key[..12]);
                return Some(candidate);
            }
            Ok(None) => log::debug!("Fix cache miss {}", &key[..12]),
            Err(e) => log::warn!("Fix cache read failed, treating as miss: {}", e),
        }

        let text = match self.prompt.render(source, record, profile) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Failed to render fix prompt: {}", e);
                return None;
            }
        };
        let request = CompletionRequest::new(text.system).with_user_message(text.user);

        log::info!("Requesting fix from {} for {}", self.llm.model(), record.summary());
        let response = match self.llm.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Model call failed: {}", e);
                return None;
            }
        };
        log::debug!("Model used {} tokens", response.usage.total());
        if response.finish_reason == FinishReason::Blocked {
            log::warn!("Model response was blocked");
            return None;
        }
        if response.finish_reason == FinishReason::MaxTokens {
            log::warn!("Model response hit the token limit; code may be truncated");
        }

        let Some(candidate) = parse_response(&response.content, profile.prompt.fence_tags) else {
            log::warn!("Model response contained no code");
            return None;
        };

        if let Err(e) = self.cache.put(&key, &candidate) {
            log::warn!("Failed to cache fix: {}", e);
        }
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::error::{FixloopError, Result};
    use crate::store::{CacheStats, MemoryFixCache, NoFixCache};

    const SOURCE: &str = "def greet_user():\n    message = \"Hello, \" + user_name\n    print(message)\n\ngreet_user()\n";
    const REPLY: &str = "Define `user_name` first.\n===FIXED CODE===\n```python\ndef greet_user():\n    user_name = \"World\"\n    message = \"Hello, \" + user_name\n    print(message)\n\ngreet_user()\n```\n";

    /// Every operation fails, as a locked or corrupt database would.
    struct BrokenCache;

    impl FixCache for BrokenCache {
        fn get(&self, _key: &str) -> Result<Option<FixCandidate>> {
            Err(FixloopError::Storage("database is locked".to_string()))
        }

        fn put(&self, _key: &str, _candidate: &FixCandidate) -> Result<()> {
            Err(FixloopError::Storage("database is locked".to_string()))
        }

        fn stats(&self) -> Result<CacheStats> {
            Err(FixloopError::Storage("database is locked".to_string()))
        }

        fn clear(&self) -> Result<u64> {
            Err(FixloopError::Storage("database is locked".to_string()))
        }
    }

    fn record() -> ErrorRecord {
        ErrorRecord::new(
            "/app/main.py",
            2,
            "NameError",
            "name 'user_name' is not defined",
            "Traceback (most recent call last): ...",
        )
    }

    fn proposer(llm: Arc<MockLlmClient>, cache: Arc<dyn FixCache>) -> FixProposer<MockLlmClient> {
        FixProposer::new(
            llm,
            cache,
            Arc::new(LanguageRegistry::builtin()),
            FixPrompt::builtin().unwrap(),
        )
    }

    #[tokio::test]
    async fn test_propose_parses_reply() {
        let llm = Arc::new(MockLlmClient::new().with_response(REPLY));
        let proposer = proposer(llm.clone(), Arc::new(MemoryFixCache::new()));

        let candidate = proposer.propose(SOURCE, &record(), Language::Python).await.unwrap();
        assert_eq!(candidate.explanation.as_deref(), Some("Define `user_name` first."));
        assert!(candidate.code.starts_with("def greet_user():\n    user_name = \"World\""));
        assert!(!candidate.code.contains("```"));

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].system.contains("Python"));
        assert!(requests[0].messages[0].content.contains("name 'user_name' is not defined"));
    }

    #[tokio::test]
    async fn test_identical_proposals_call_model_once() {
        let llm = Arc::new(MockLlmClient::always(REPLY));
        let proposer = proposer(llm.clone(), Arc::new(MemoryFixCache::new()));

        let first = proposer.propose(SOURCE, &record(), Language::Python).await;
        let second = proposer.propose(SOURCE, &record(), Language::Python).await;
        assert_eq!(first, second);
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_prepopulated_cache_skips_model() {
        let cache = Arc::new(MemoryFixCache::new());
        let stored = FixCandidate {
            explanation: None,
            code: "print('cached')\n".to_string(),
        };
        cache
            .put(&cache_key(SOURCE, &record(), "python"), &stored)
            .unwrap();

        let llm = Arc::new(MockLlmClient::new());
        let proposer = proposer(llm.clone(), cache);
        let candidate = proposer.propose(SOURCE, &record(), Language::Python).await;
        assert_eq!(candidate, Some(stored));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_model_failure_is_absent_and_not_cached() {
        let llm = Arc::new(MockLlmClient::new().with_error("quota exceeded").with_response(REPLY));
        let cache = Arc::new(MemoryFixCache::new());
        let proposer = proposer(llm.clone(), cache.clone());

        assert!(proposer.propose(SOURCE, &record(), Language::Python).await.is_none());
        assert_eq!(cache.stats().unwrap().entries, 0);

        assert!(proposer.propose(SOURCE, &record(), Language::Python).await.is_some());
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_reply_is_absent() {
        let llm = Arc::new(MockLlmClient::new().with_response("   \n"));
        let proposer = proposer(llm, Arc::new(NoFixCache));
        assert!(proposer.propose(SOURCE, &record(), Language::Python).await.is_none());
    }

    #[tokio::test]
    async fn test_disabled_cache_always_calls_model() {
        let llm = Arc::new(MockLlmClient::always(REPLY));
        let proposer = proposer(llm.clone(), Arc::new(NoFixCache));
        proposer.propose(SOURCE, &record(), Language::Python).await;
        proposer.propose(SOURCE, &record(), Language::Python).await;
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_broken_cache_is_a_miss() {
        let llm = Arc::new(MockLlmClient::new().with_response(REPLY));
        let proposer = proposer(llm.clone(), Arc::new(BrokenCache));

        let candidate = proposer.propose(SOURCE, &record(), Language::Python).await;
        assert!(candidate.is_some_and(|c| c.code.contains("user_name = \"World\"")));
        assert_eq!(llm.call_count(), 1);
    }
}
