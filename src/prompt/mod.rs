//! Prompt System - Template loading and rendering
//!
//! Templates are Handlebars. The fix prompt ships built in and can be
//! replaced by a `fix.hbs` file in the configured templates directory.

mod fix;
mod loader;
mod render;

pub use fix::{FixPrompt, FixPromptText, SEPARATOR};
pub use loader::PromptLoader;
pub use render::PromptRenderer;
