//! Container runner driving a docker-compatible CLI.
//!
//! One run is: check/pull image, `create` a named container with the
//! script's directory bind-mounted, `start`, `wait` for the exit code,
//! read `logs` (stdout and stderr arrive on separate streams), `rm -f`.
//! The container is owned by a [`ContainerLease`] so removal happens even
//! when an intermediate step fails.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

use super::{ExecutionResult, Sandbox};
use crate::config::{PullPolicy, SandboxConfig};
use crate::id::generate_container_name;
use crate::language::{LanguageProfile, LanguageRegistry};

#[derive(Debug, thiserror::Error)]
enum RunFailure {
    #[error("Container image {0} not found.")]
    ImageNotFound(String),

    #[error("Container execution failed: {0}")]
    Engine(String),
}

type RunResult<T> = std::result::Result<T, RunFailure>;

/// Stderr fragments the common engines print when a registry has no such image.
const MISSING_IMAGE_MARKERS: &[&str] = &[
    "not found",
    "manifest unknown",
    "pull access denied",
    "does not exist",
    "no such image",
];

/// Arguments for `<engine> create`.
pub fn create_args(
    name: &str,
    host_dir: &Path,
    mount_point: &str,
    image: &str,
    argv: &[String],
) -> Vec<String> {
    let mut args = vec![
        "create".to_string(),
        "--name".to_string(),
        name.to_string(),
        "-v".to_string(),
        format!("{}:{}:rw", host_dir.display(), mount_point),
        "-w".to_string(),
        mount_point.to_string(),
        image.to_string(),
    ];
    args.extend(argv.iter().cloned());
    args
}

/// Exclusive handle on one created container.
///
/// Call [`ContainerLease::release`] when done; a lease dropped without
/// release removes the container synchronously.
#[derive(Debug)]
pub struct ContainerLease {
    engine: String,
    name: String,
    released: bool,
}

impl ContainerLease {
    fn new(engine: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            name: name.into(),
            released: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Force-remove the container. Failures are logged, never returned.
    pub async fn release(mut self) {
        self.released = true;
        let output = Command::new(&self.engine)
            .args(["rm", "-f", &self.name])
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;
        match output {
            Ok(out) if out.status.success() => {
                log::debug!("Removed container {}", self.name);
            }
            Ok(out) => log::warn!(
                "Failed to remove container {}: {}",
                self.name,
                String::from_utf8_lossy(&out.stderr).trim()
            ),
            Err(e) => log::warn!("Failed to remove container {}: {}", self.name, e),
        }
    }
}

impl Drop for ContainerLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        log::warn!("Container {} dropped without release, removing", self.name);
        let result = std::process::Command::new(&self.engine)
            .args(["rm", "-f", &self.name])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if let Err(e) = result {
            log::warn!("Failed to remove container {}: {}", self.name, e);
        }
    }
}

/// [`Sandbox`] backed by a container engine.
pub struct ContainerRunner {
    config: SandboxConfig,
    registry: Arc<LanguageRegistry>,
    scope: String,
}

impl ContainerRunner {
    pub fn new(config: SandboxConfig, registry: Arc<LanguageRegistry>) -> Self {
        Self {
            config,
            registry,
            scope: "run".to_string(),
        }
    }

    /// Prefix container names with a session id.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn engine(&self) -> &str {
        &self.config.engine
    }

    async fn engine_output(&self, args: &[&str]) -> RunResult<std::process::Output> {
        log::debug!("{} {}", self.config.engine, args.join(" "));
        Command::new(&self.config.engine)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| RunFailure::Engine(format!("failed to invoke {}: {}", self.config.engine, e)))
    }

    async fn image_present(&self, image: &str) -> RunResult<bool> {
        let output = self.engine_output(&["image", "inspect", image]).await?;
        Ok(output.status.success())
    }

    async fn pull(&self, image: &str) -> RunResult<()> {
        log::info!("Pulling image {}", image);
        let output = self.engine_output(&["pull", image]).await?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).to_lowercase();
        if MISSING_IMAGE_MARKERS.iter().any(|m| stderr.contains(m)) {
            Err(RunFailure::ImageNotFound(image.to_string()))
        } else {
            Err(RunFailure::Engine(format!("pull {}: {}", image, stderr.trim())))
        }
    }

    async fn ensure_image(&self, image: &str) -> RunResult<()> {
        match self.config.pull_policy {
            PullPolicy::Always => self.pull(image).await,
            PullPolicy::Missing => {
                if self.image_present(image).await? {
                    Ok(())
                } else {
                    self.pull(image).await
                }
            }
            PullPolicy::Never => {
                if self.image_present(image).await? {
                    Ok(())
                } else {
                    Err(RunFailure::ImageNotFound(image.to_string()))
                }
            }
        }
    }

    async fn create(&self, host_dir: &Path, file_name: &str, profile: &LanguageProfile) -> RunResult<ContainerLease> {
        let name = generate_container_name(&self.scope);
        let args = create_args(
            &name,
            host_dir,
            &self.config.mount_point,
            &profile.image,
            &profile.argv(file_name),
        );
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.engine_output(&arg_refs).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lowered = stderr.to_lowercase();
            if lowered.contains("no such image") || lowered.contains("unable to find image") {
                return Err(RunFailure::ImageNotFound(profile.image.clone()));
            }
            return Err(RunFailure::Engine(format!("create: {}", stderr.trim())));
        }
        log::debug!("Created container {}", name);
        Ok(ContainerLease::new(&self.config.engine, name))
    }

    /// Start, wait, and collect output from a created container.
    async fn drive(&self, lease: &ContainerLease) -> RunResult<ExecutionResult> {
        let started = self.engine_output(&["start", lease.name()]).await?;
        if !started.status.success() {
            return Err(RunFailure::Engine(format!(
                "start: {}",
                String::from_utf8_lossy(&started.stderr).trim()
            )));
        }

        let waited = self.engine_output(&["wait", lease.name()]).await?;
        if !waited.status.success() {
            return Err(RunFailure::Engine(format!(
                "wait: {}",
                String::from_utf8_lossy(&waited.stderr).trim()
            )));
        }
        let exit_text = String::from_utf8_lossy(&waited.stdout);
        let exit_status = exit_text
            .lines()
            .rev()
            .find_map(|l| l.trim().parse::<i32>().ok())
            .ok_or_else(|| RunFailure::Engine(format!("unexpected wait output: {}", exit_text.trim())))?;

        let logs = self.engine_output(&["logs", lease.name()]).await?;
        if !logs.status.success() {
            return Err(RunFailure::Engine(format!(
                "logs: {}",
                String::from_utf8_lossy(&logs.stderr).trim()
            )));
        }

        Ok(ExecutionResult::new(
            String::from_utf8_lossy(&logs.stdout),
            String::from_utf8_lossy(&logs.stderr),
            exit_status,
        ))
    }

    async fn run(&self, file_path: &Path, profile: &LanguageProfile) -> RunResult<ExecutionResult> {
        let absolute = tokio::fs::canonicalize(file_path)
            .await
            .map_err(|e| RunFailure::Engine(format!("resolve {}: {}", file_path.display(), e)))?;
        let host_dir = absolute.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("/"));
        let file_name = absolute
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| RunFailure::Engine(format!("no file name in {}", absolute.display())))?;

        self.ensure_image(&profile.image).await?;

        let lease = self.create(&host_dir, &file_name, profile).await?;
        let result = self.drive(&lease).await;
        lease.release().await;
        result
    }
}

#[async_trait]
impl Sandbox for ContainerRunner {
    async fn execute(&self, file_path: &Path, language: &str) -> ExecutionResult {
        if !file_path.is_file() {
            return ExecutionResult::setup_failure(format!("Error: File not found at {}", file_path.display()));
        }
        let Some(profile) = self.registry.lookup(language) else {
            return ExecutionResult::setup_failure(format!("Unsupported language: {}", language));
        };

        log::info!("Executing {} in {}", file_path.display(), profile.image);
        match self.run(file_path, profile).await {
            Ok(result) => {
                log::info!("Run finished with exit status {}", result.exit_status);
                result
            }
            Err(failure) => {
                log::warn!("{}", failure);
                ExecutionResult::setup_failure(failure.to_string())
            }
        }
    }
}
