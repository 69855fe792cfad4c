//! Language registry - everything that varies per supported language
//!
//! The Control Loop never names a language. The runner asks the registry
//! for the image and invocation command, the classifier for the extraction
//! routine, and the proposer for the prompt profile. Adding a language means
//! adding a variant and a profile here.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::LanguageOverride;
use crate::diagnose::{self, ErrorRecord};
use crate::error::{FixloopError, Result};

/// Supported languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Python, Language::JavaScript];

    /// Canonical tag, also used in cache keys.
    pub fn tag(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for Language {
    type Err = FixloopError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "javascript" | "js" | "node" => Ok(Language::JavaScript),
            other => Err(FixloopError::Config(format!("Unsupported language: {}", other))),
        }
    }
}

/// Extraction routine signature.
pub type ClassifyFn = fn(&str) -> Option<ErrorRecord>;

/// A worked bug/fix pair shown to the model.
#[derive(Debug, Clone, Copy)]
pub struct FixExample {
    pub buggy: &'static str,
    pub explanation: &'static str,
    pub fixed: &'static str,
}

/// Prompt-facing facts about a language.
#[derive(Debug, Clone, Copy)]
pub struct PromptProfile {
    /// Name used in role framing ("an expert Python programmer")
    pub display_name: &'static str,
    /// Markdown fence info strings the model tends to emit
    pub fence_tags: &'static [&'static str],
    pub example: FixExample,
}

/// Capabilities of one language.
#[derive(Debug, Clone)]
pub struct LanguageProfile {
    pub language: Language,
    /// Container image the script runs in
    pub image: String,
    /// Interpreter invocation, split on whitespace; the file name is appended
    pub command: String,
    /// File extension without the dot
    pub extension: &'static str,
    pub classify: ClassifyFn,
    pub prompt: PromptProfile,
}

impl LanguageProfile {
    /// Command words followed by the script name.
    pub fn argv(&self, file_name: &str) -> Vec<String> {
        self.command
            .split_whitespace()
            .map(str::to_string)
            .chain(std::iter::once(file_name.to_string()))
            .collect()
    }
}

const PYTHON_EXAMPLE: FixExample = FixExample {
    buggy: r#"def greet_user():
    message = "Hello, " + user_name
    print(message)

greet_user()
"#,
    explanation: "`user_name` is used before it is defined; define it before building the message.",
    fixed: r#"def greet_user():
    user_name = "World"
    message = "Hello, " + user_name
    print(message)

greet_user()
"#,
};

const JAVASCRIPT_EXAMPLE: FixExample = FixExample {
    buggy: r#"function greetUser() {
    const message = "Hello, World!";
    consol.log(message);
}

greetUser();
"#,
    explanation: "`consol` is a typo for the global `console` object.",
    fixed: r#"function greetUser() {
    const message = "Hello, World!";
    console.log(message);
}

greetUser();
"#,
};

fn builtin_profile(language: Language) -> LanguageProfile {
    match language {
        Language::Python => LanguageProfile {
            language,
            image: "python:3.10-slim".to_string(),
            command: "python".to_string(),
            extension: "py",
            classify: diagnose::python::classify,
            prompt: PromptProfile {
                display_name: "Python",
                fence_tags: &["python", "py", "python3"],
                example: PYTHON_EXAMPLE,
            },
        },
        Language::JavaScript => LanguageProfile {
            language,
            image: "node:18-slim".to_string(),
            command: "node".to_string(),
            extension: "js",
            classify: diagnose::javascript::classify,
            prompt: PromptProfile {
                display_name: "JavaScript",
                fence_tags: &["javascript", "js", "node"],
                example: JAVASCRIPT_EXAMPLE,
            },
        },
    }
}

/// Typed mapping from [`Language`] to its [`LanguageProfile`].
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    profiles: Vec<LanguageProfile>,
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LanguageRegistry {
    /// Registry with the built-in images and commands.
    pub fn builtin() -> Self {
        Self {
            profiles: Language::ALL.iter().map(|l| builtin_profile(*l)).collect(),
        }
    }

    /// Built-in registry with per-language image/command overrides applied.
    ///
    /// Override keys are language tags; unknown tags are a config error.
    pub fn with_overrides(overrides: &HashMap<String, LanguageOverride>) -> Result<Self> {
        let mut registry = Self::builtin();
        for (tag, over) in overrides {
            let language: Language = tag.parse()?;
            let profile = registry
                .profiles
                .iter_mut()
                .find(|p| p.language == language)
                .ok_or_else(|| FixloopError::Config(format!("No profile for {}", language)))?;
            if let Some(image) = &over.image {
                profile.image = image.clone();
            }
            if let Some(command) = &over.command {
                if command.split_whitespace().next().is_none() {
                    return Err(FixloopError::Config(format!("Empty command for {}", language)));
                }
                profile.command = command.clone();
            }
        }
        Ok(registry)
    }

    pub fn get(&self, language: Language) -> Option<&LanguageProfile> {
        self.profiles.iter().find(|p| p.language == language)
    }

    /// Resolve a user-supplied tag (`python`, `js`, ...).
    pub fn lookup(&self, tag: &str) -> Option<&LanguageProfile> {
        let language: Language = tag.parse().ok()?;
        self.get(language)
    }

    /// Resolve by file extension (with or without the dot).
    pub fn for_extension(&self, extension: &str) -> Option<&LanguageProfile> {
        let ext = extension.trim_start_matches('.');
        match ext {
            "mjs" | "cjs" => self.get(Language::JavaScript),
            _ => self.profiles.iter().find(|p| p.extension.eq_ignore_ascii_case(ext)),
        }
    }

    pub fn profiles(&self) -> &[LanguageProfile] {
        &self.profiles
    }
}
