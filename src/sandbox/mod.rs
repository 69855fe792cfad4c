//! Isolated Runner - execute one source file in a disposable container

mod container;
#[cfg(test)]
mod scripted;

pub use container::{ContainerLease, ContainerRunner, create_args};
#[cfg(test)]
pub use scripted::ScriptedSandbox;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Exit status used for failures that happen before or around the run itself.
pub const SETUP_FAILURE_STATUS: i32 = -1;

/// Captured output of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: i32,
}

impl ExecutionResult {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_status: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_status,
        }
    }

    /// Synthetic result for environment failures (missing file, no image, ...).
    pub fn setup_failure(message: impl Into<String>) -> Self {
        Self::new(String::new(), message, SETUP_FAILURE_STATUS)
    }

    pub fn succeeded(&self) -> bool {
        self.exit_status == 0
    }

    pub fn is_setup_failure(&self) -> bool {
        self.exit_status == SETUP_FAILURE_STATUS
    }
}

/// Runs a script and reports what happened. Never fails past this boundary:
/// every problem is folded into the returned [`ExecutionResult`].
#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn execute(&self, file_path: &Path, language: &str) -> ExecutionResult;
}
