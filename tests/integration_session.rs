//! Session integration tests
//!
//! Full repair sessions with a replaying sandbox and model client. The
//! container-backed scenarios at the bottom need a running Docker daemon and
//! are ignored by default.

mod common;

use std::sync::Arc;

use common::{ReplayLlm, ReplaySandbox};
use fixloop::config::SandboxConfig;
use fixloop::diagnose::{self, Classifier};
use fixloop::error::Result;
use fixloop::language::{Language, LanguageRegistry};
use fixloop::prompt::FixPrompt;
use fixloop::propose::{FixCandidate, FixProposer, cache_key};
use fixloop::sandbox::{ContainerRunner, ExecutionResult, Sandbox};
use fixloop::session::{AutoApprover, SessionRunner, SessionRunnerConfig, SessionState, StopReason};
use fixloop::store::{FixCache, SqliteFixCache};
use fixloop::workspace::WorkspaceManager;
use tempfile::TempDir;

const PY_BUGGY: &str = "def greet_user():\n    message = \"Hello, \" + user_name\n    print(message)\n\ngreet_user()\n";
const PY_FIXED: &str = "def greet_user():\n    user_name = \"World\"\n    message = \"Hello, \" + user_name\n    print(message)\n\ngreet_user()\n";
const PY_STDERR: &str = "Traceback (most recent call last):
  File \"/app/main.py\", line 5, in <module>
    greet_user()
  File \"/app/main.py\", line 2, in greet_user
    message = \"Hello, \" + user_name
              ^^^^^^^^^^^^^^^^^^^^^^
NameError: name 'user_name' is not defined
";

const JS_BUGGY: &str = "function greetUser() {\n    const message = \"Hello, World!\";\n    consol.log(message);\n}\n\ngreetUser();\n";
const JS_FIXED: &str = "function greetUser() {\n    const message = \"Hello, World!\";\n    console.log(message);\n}\n\ngreetUser();\n";
const JS_STDERR: &str = "/app/main.js:3
    consol.log(message);
    ^

ReferenceError: consol is not defined
    at greetUser (/app/main.js:3:5)
    at Object.<anonymous> (/app/main.js:6:1)
    at Module._compile (node:internal/modules/cjs/loader:1256:14)

Node.js v18.20.4
";

fn runner<S: Sandbox>(
    dir: &TempDir,
    sandbox: Arc<S>,
    llm: Arc<ReplayLlm>,
    cache: Arc<dyn FixCache>,
    max_attempts: u32,
) -> SessionRunner<S, ReplayLlm> {
    let registry = Arc::new(LanguageRegistry::builtin());
    let proposer = FixProposer::new(llm, cache, registry.clone(), FixPrompt::builtin().unwrap());
    SessionRunner::with_config(
        sandbox,
        Classifier::new(registry),
        proposer,
        Arc::new(AutoApprover),
        WorkspaceManager::new(dir.path().join("work")),
        SessionRunnerConfig {
            max_attempts,
            journal_dir: None,
        },
    )
}

#[tokio::test]
async fn test_python_name_error_is_repaired() -> Result<()> {
    let dir = TempDir::new()?;
    let sandbox = Arc::new(
        ReplaySandbox::always(ExecutionResult::new("Hello, World\n", "", 0))
            .with_result(ExecutionResult::new("", PY_STDERR, 1)),
    );
    let reply = format!("Define `user_name` first.\n===FIXED CODE===\n```python\n{}```\n", PY_FIXED);
    let llm = Arc::new(ReplayLlm::new().with_response(reply));
    let cache = Arc::new(SqliteFixCache::in_memory()?);

    let outcome = runner(&dir, sandbox.clone(), llm.clone(), cache.clone(), 5)
        .run("main.py", PY_BUGGY, Language::Python)
        .await?;

    assert!(outcome.is_success());
    assert_eq!(outcome.final_source, PY_FIXED);
    assert_eq!(sandbox.seen_sources()[1], PY_FIXED);
    assert_eq!(llm.call_count(), 1);
    assert_eq!(cache.stats()?.entries, 1);

    let prompt = &llm.requests()[0].messages[0].content;
    assert!(prompt.contains("NameError"));
    assert!(prompt.contains(PY_BUGGY));
    Ok(())
}

#[tokio::test]
async fn test_javascript_reference_error_is_repaired() -> Result<()> {
    let dir = TempDir::new()?;
    let sandbox = Arc::new(
        ReplaySandbox::always(ExecutionResult::new("Hello, World!\n", "", 0))
            .with_result(ExecutionResult::new("", JS_STDERR, 1)),
    );
    let reply = format!("`consol` is a typo.\n===FIXED CODE===\n{}", JS_FIXED);
    let llm = Arc::new(ReplayLlm::new().with_response(reply));
    let cache = Arc::new(SqliteFixCache::in_memory()?);

    let outcome = runner(&dir, sandbox, llm, cache, 5)
        .run("main.js", JS_BUGGY, Language::JavaScript)
        .await?;

    assert_eq!(outcome.state, SessionState::Success);
    assert_eq!(outcome.attempts, 2);
    let error = outcome.last_error.unwrap();
    assert_eq!(error.error_type, "ReferenceError");
    assert_eq!(error.line_number, 3);
    assert_eq!(outcome.final_source, JS_FIXED);
    Ok(())
}

#[tokio::test]
async fn test_unhelpful_fixes_exhaust_budget() -> Result<()> {
    let dir = TempDir::new()?;
    let sandbox = Arc::new(ReplaySandbox::always(ExecutionResult::new("", PY_STDERR, 1)));
    // The "fix" never addresses the error.
    let reply = format!("Reformatted.\n===FIXED CODE===\n{}", PY_BUGGY.replace("    print", "    print "));
    let llm = Arc::new(ReplayLlm::always(reply));
    let cache = Arc::new(SqliteFixCache::in_memory()?);

    let outcome = runner(&dir, sandbox.clone(), llm, cache, 3)
        .run("main.py", PY_BUGGY, Language::Python)
        .await?;

    assert_eq!(outcome.stop_reason(), Some(StopReason::Exhausted));
    assert_eq!(sandbox.execution_count(), 3);
    assert_eq!(outcome.attempts, 3);
    assert!(outcome.changed());
    assert_eq!(outcome.summary(), "Gave up after 3 attempts.");
    Ok(())
}

#[tokio::test]
async fn test_persisted_fix_skips_model() -> Result<()> {
    let dir = TempDir::new()?;
    let db = dir.path().join("fixes.db");

    let record = diagnose::classify(PY_STDERR, "python").expect("stderr should classify");
    {
        let cache = SqliteFixCache::open_at(&db)?;
        cache.put(
            &cache_key(PY_BUGGY, &record, "python"),
            &FixCandidate {
                explanation: Some("cached".to_string()),
                code: PY_FIXED.to_string(),
            },
        )?;
    }

    let sandbox = Arc::new(
        ReplaySandbox::always(ExecutionResult::new("Hello, World\n", "", 0))
            .with_result(ExecutionResult::new("", PY_STDERR, 1)),
    );
    let llm = Arc::new(ReplayLlm::new());
    let cache = Arc::new(SqliteFixCache::open_at(&db)?);

    let outcome = runner(&dir, sandbox, llm.clone(), cache.clone(), 5)
        .run("main.py", PY_BUGGY, Language::Python)
        .await?;

    assert!(outcome.is_success());
    assert_eq!(llm.call_count(), 0);
    assert_eq!(cache.stats()?.hits, 1);
    Ok(())
}

#[tokio::test]
async fn test_missing_file_never_reaches_engine() {
    let dir = TempDir::new().unwrap();
    let config = SandboxConfig {
        engine: "/nonexistent/engine".to_string(),
        ..SandboxConfig::default()
    };
    let runner = ContainerRunner::new(config, Arc::new(LanguageRegistry::builtin()));
    let result = runner.execute(&dir.path().join("main.py"), "python").await;
    assert_eq!(result.exit_status, -1);
    assert!(!result.stderr.is_empty());
    assert!(diagnose::classify(&result.stderr, "python").is_none());
}

mod docker {
    //! Real container runs. `cargo test -- --ignored` with Docker available.

    use super::*;

    fn write(dir: &TempDir, name: &str, source: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, source).unwrap();
        path
    }

    #[tokio::test]
    #[ignore]
    async fn test_python_name_error_in_container() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "main.py", PY_BUGGY);
        let runner = ContainerRunner::new(SandboxConfig::default(), Arc::new(LanguageRegistry::builtin()));

        let result = runner.execute(&file, "python").await;
        assert_ne!(result.exit_status, 0);
        let record = diagnose::classify(&result.stderr, "python").unwrap();
        assert_eq!(record.error_type, "NameError");
        assert_eq!(record.line_number, 2);
    }

    #[tokio::test]
    #[ignore]
    async fn test_javascript_reference_error_in_container() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "main.js", JS_BUGGY);
        let runner = ContainerRunner::new(SandboxConfig::default(), Arc::new(LanguageRegistry::builtin()));

        let result = runner.execute(&file, "javascript").await;
        assert_ne!(result.exit_status, 0);
        let record = diagnose::classify(&result.stderr, "javascript").unwrap();
        assert_eq!(record.error_type, "ReferenceError");
        assert_eq!(record.line_number, 3);
    }

    #[tokio::test]
    #[ignore]
    async fn test_fixed_python_runs_clean() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "main.py", PY_FIXED);
        let runner = ContainerRunner::new(SandboxConfig::default(), Arc::new(LanguageRegistry::builtin()));

        let result = runner.execute(&file, "python").await;
        assert!(result.succeeded(), "stderr: {}", result.stderr);
        assert_eq!(result.stdout, "Hello, World\n");
    }
}
