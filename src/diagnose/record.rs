//! Structured error record extracted from a failure report.

use serde::{Deserialize, Serialize};

/// Structured extraction of a raw failure report.
///
/// Field names follow the external interface (`file_path`, `line_number`,
/// `error_type`, `error_message`, `stack_trace`). `stack_trace` is the full
/// stderr, verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// File named by the deepest frame preceding the terminal error line
    pub file_path: String,
    /// 1-based line number within `file_path`
    pub line_number: u32,
    /// Error kind token, e.g. `NameError` or `ReferenceError`
    pub error_type: String,
    /// Trimmed free-text message
    pub error_message: String,
    /// Original trace, untouched
    pub stack_trace: String,
}

impl ErrorRecord {
    pub fn new(
        file_path: impl Into<String>,
        line_number: u32,
        error_type: impl Into<String>,
        error_message: impl Into<String>,
        stack_trace: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            line_number,
            error_type: error_type.into(),
            error_message: error_message.into().trim().to_string(),
            stack_trace: stack_trace.into(),
        }
    }

    /// Location string in `file:line` form.
    pub fn location(&self) -> String {
        format!("{}:{}", self.file_path, self.line_number)
    }

    /// One-line summary, e.g. `NameError: name 'x' is not defined (main.py:3)`.
    pub fn summary(&self) -> String {
        if self.error_message.is_empty() {
            format!("{} ({})", self.error_type, self.location())
        } else {
            format!("{}: {} ({})", self.error_type, self.error_message, self.location())
        }
    }

    /// Canonical serialization: JSON with keys in sorted order.
    ///
    /// `serde_json::Value` objects are backed by a `BTreeMap`, so converting
    /// through `Value` makes the output independent of struct field order.
    pub fn canonical_json(&self) -> String {
        serde_json::to_value(self)
            .map(|v| v.to_string())
            .unwrap_or_default()
    }
}
