//! In-process sandbox for unit tests that replays queued results.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use super::{ExecutionResult, Sandbox};

/// Returns queued results in order, then the fallback. Records the file
/// contents seen on every run.
#[derive(Debug, Default)]
pub struct ScriptedSandbox {
    results: Mutex<VecDeque<ExecutionResult>>,
    fallback: Option<ExecutionResult>,
    sources: Mutex<Vec<String>>,
    runs: AtomicU32,
}

impl ScriptedSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn always(result: ExecutionResult) -> Self {
        Self {
            fallback: Some(result),
            ..Self::default()
        }
    }

    pub fn with_result(self, result: ExecutionResult) -> Self {
        if let Ok(mut results) = self.results.lock() {
            results.push_back(result);
        }
        self
    }

    pub fn execution_count(&self) -> u32 {
        self.runs.load(Ordering::SeqCst)
    }

    /// File contents at each run, oldest first.
    pub fn seen_sources(&self) -> Vec<String> {
        self.sources.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Sandbox for ScriptedSandbox {
    async fn execute(&self, file_path: &Path, _language: &str) -> ExecutionResult {
        let source = match tokio::fs::read_to_string(file_path).await {
            Ok(source) => source,
            Err(_) => {
                return ExecutionResult::setup_failure(format!(
                    "Error: File not found at {}",
                    file_path.display()
                ));
            }
        };
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut sources) = self.sources.lock() {
            sources.push(source);
        }
        let next = self.results.lock().ok().and_then(|mut r| r.pop_front());
        next.or_else(|| self.fallback.clone())
            .unwrap_or_else(|| ExecutionResult::setup_failure("no scripted result"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_replays_then_falls_back() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("main.py");
        std::fs::write(&file, "print(1)\n").unwrap();

        let sandbox = ScriptedSandbox::always(ExecutionResult::new("1\n", "", 0))
            .with_result(ExecutionResult::new("", "boom", 1));

        assert_eq!(sandbox.execute(&file, "python").await.exit_status, 1);
        assert_eq!(sandbox.execute(&file, "python").await.exit_status, 0);
        assert_eq!(sandbox.execution_count(), 2);
        assert_eq!(sandbox.seen_sources(), vec!["print(1)\n", "print(1)\n"]);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_a_run() {
        let dir = TempDir::new().unwrap();
        let sandbox = ScriptedSandbox::new();
        let result = sandbox.execute(&dir.path().join("gone.py"), "python").await;
        assert!(result.is_setup_failure());
        assert!(result.stderr.starts_with("Error: File not found at"));
        assert_eq!(sandbox.execution_count(), 0);
    }
}
