//! Error Classifier - turn raw stderr into a structured [`ErrorRecord`]
//!
//! Dispatch goes through the language registry: each language profile
//! carries the extraction routine tuned to its runtime's default error
//! reporter. When a reporter's format drifts (e.g. across runtime versions)
//! the routine returns `None` rather than a partial record; callers treat
//! that as "could not diagnose".

pub mod javascript;
pub mod python;
mod record;

use std::sync::Arc;

use crate::language::LanguageRegistry;

pub use record::ErrorRecord;

/// Classifies failure reports using the routines registered per language.
#[derive(Debug, Clone)]
pub struct Classifier {
    registry: Arc<LanguageRegistry>,
}

impl Classifier {
    pub fn new(registry: Arc<LanguageRegistry>) -> Self {
        Self { registry }
    }

    /// Parse `stderr` with the routine registered for `language`.
    ///
    /// Returns `None` for empty input, unknown language tags, and text the
    /// routine does not recognise.
    pub fn classify(&self, stderr: &str, language: &str) -> Option<ErrorRecord> {
        if stderr.trim().is_empty() {
            return None;
        }
        let Some(profile) = self.registry.lookup(language) else {
            log::debug!("No classifier registered for language '{}'", language);
            return None;
        };
        let record = (profile.classify)(stderr);
        match &record {
            Some(r) => log::info!("Classified failure: {}", r.summary()),
            None => log::warn!("Could not parse {} failure report", profile.language),
        }
        record
    }
}

/// Classify with the built-in registry.
pub fn classify(stderr: &str, language: &str) -> Option<ErrorRecord> {
    Classifier::new(Arc::new(LanguageRegistry::builtin())).classify(stderr, language)
}
