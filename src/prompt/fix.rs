//! The fix prompt: role framing, a worked example, the structured error and
//! the buggy source, with instructions to answer as
//! `explanation`, separator line, corrected source.

use serde::Serialize;

use super::loader::PromptLoader;
use super::render::PromptRenderer;
use crate::diagnose::ErrorRecord;
use crate::error::Result;
use crate::language::{FixExample, LanguageProfile};

/// Line the model must emit between its explanation and the fixed code.
pub const SEPARATOR: &str = "===FIXED CODE===";

const TEMPLATE_NAME: &str = "fix";

const SYSTEM_TEMPLATE: &str = "You are an expert {{display_name}} programmer who fixes broken programs.";

const FIX_TEMPLATE: &str = r#"The following {{display_name}} program fails when run. Fix it so that it runs without this error.

Respond with exactly three parts and nothing else:
1. A short explanation of the bug and of your fix.
2. A line containing only {{separator}}
3. The complete corrected program.

Do not wrap the program in markdown code fences and do not add any other formatting.

## Example

Buggy program:
{{example.buggy}}
Response:
{{example.explanation}}
{{separator}}
{{example.fixed}}
## Error

Type: {{error.error_type}}
Message: {{error.error_message}}
Location: {{error.file_path}}, line {{error.line_number}}

Full trace:
{{error.stack_trace}}

## Program

{{source}}
"#;

#[derive(Debug, Serialize)]
struct FixContext<'a> {
    language: &'a str,
    display_name: &'a str,
    separator: &'a str,
    example: ExampleContext<'a>,
    error: &'a ErrorRecord,
    source: &'a str,
}

#[derive(Debug, Serialize)]
struct ExampleContext<'a> {
    buggy: &'a str,
    explanation: &'a str,
    fixed: &'a str,
}

impl<'a> From<&'a FixExample> for ExampleContext<'a> {
    fn from(example: &'a FixExample) -> Self {
        Self {
            buggy: example.buggy,
            explanation: example.explanation,
            fixed: example.fixed,
        }
    }
}

/// Rendered system and user prompt text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixPromptText {
    pub system: String,
    pub user: String,
}

/// Builds the fix prompt from the built-in template or a `fix.hbs` override.
pub struct FixPrompt {
    renderer: PromptRenderer,
}

impl FixPrompt {
    pub fn builtin() -> Result<Self> {
        Self::from_template(FIX_TEMPLATE)
    }

    /// Use `<templates_dir>/fix.hbs` when present, else the built-in template.
    pub fn with_loader(loader: &PromptLoader) -> Result<Self> {
        if loader.exists(TEMPLATE_NAME) {
            let template = loader.load(TEMPLATE_NAME)?;
            log::info!("Using prompt override from {}", loader.templates_dir().display());
            Self::from_template(&template)
        } else {
            Self::builtin()
        }
    }

    fn from_template(template: &str) -> Result<Self> {
        let mut renderer = PromptRenderer::new();
        renderer.register_template(TEMPLATE_NAME, template)?;
        Ok(Self { renderer })
    }

    pub fn render(&self, source: &str, error: &ErrorRecord, profile: &LanguageProfile) -> Result<FixPromptText> {
        let context = FixContext {
            language: profile.language.tag(),
            display_name: profile.prompt.display_name,
            separator: SEPARATOR,
            example: ExampleContext::from(&profile.prompt.example),
            error,
            source,
        };
        Ok(FixPromptText {
            system: self.renderer.render_with(SYSTEM_TEMPLATE, &context)?,
            user: self.renderer.render_named(TEMPLATE_NAME, &context)?,
        })
    }
}
