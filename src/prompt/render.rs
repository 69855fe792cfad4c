//! Handlebars rendering for prompt text

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{FixloopError, Result};

/// Handlebars registry configured for prompt text: lenient about missing
/// fields and never HTML-escaping (source code goes through verbatim).
pub struct PromptRenderer {
    registry: Handlebars<'static>,
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRenderer {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        registry.register_escape_fn(handlebars::no_escape);
        Self { registry }
    }

    /// Render an ad-hoc template.
    pub fn render_with<T: Serialize>(&self, template: &str, context: &T) -> Result<String> {
        self.registry
            .render_template(template, context)
            .map_err(|e| FixloopError::Config(format!("Prompt render failed: {}", e)))
    }

    pub fn register_template(&mut self, name: &str, template: &str) -> Result<()> {
        self.registry
            .register_template_string(name, template)
            .map_err(|e| FixloopError::Config(format!("Invalid prompt template '{}': {}", name, e)))
    }

    pub fn render_named<T: Serialize>(&self, name: &str, context: &T) -> Result<String> {
        self.registry
            .render(name, context)
            .map_err(|e| FixloopError::Config(format!("Prompt '{}' render failed: {}", name, e)))
    }
}
