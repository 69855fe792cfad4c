//! WorkspaceManager handles session directory lifecycle.

use crate::error::{FixloopError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Manages per-session workspaces under a base directory.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    base_path: PathBuf,
}

impl WorkspaceManager {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Create `{base_path}/{session_id}` and write the working copy into it.
    ///
    /// Returns the working copy's path.
    pub fn create(&self, session_id: &str, file_name: &str, source: &str) -> Result<PathBuf> {
        if file_name.is_empty() || Path::new(file_name).components().count() != 1 {
            return Err(FixloopError::Workspace(format!("Invalid file name: {:?}", file_name)));
        }
        let dir = self.path(session_id);
        if dir.exists() {
            return Err(FixloopError::Workspace(format!(
                "Workspace already exists: {}",
                dir.display()
            )));
        }
        fs::create_dir_all(&dir)
            .map_err(|e| FixloopError::Workspace(format!("Failed to create {}: {}", dir.display(), e)))?;

        let working_copy = dir.join(file_name);
        fs::write(&working_copy, source).map_err(|e| {
            FixloopError::Workspace(format!("Failed to write {}: {}", working_copy.display(), e))
        })?;

        log::debug!("Created workspace {}", dir.display());
        Ok(working_copy)
    }

    /// Remove the session's workspace, working copy and backup included.
    ///
    /// Removing a workspace that does not exist is not an error.
    pub fn cleanup(&self, session_id: &str) -> Result<()> {
        let dir = self.path(session_id);
        if !dir.exists() {
            return Ok(());
        }
        fs::remove_dir_all(&dir)
            .map_err(|e| FixloopError::Workspace(format!("Failed to remove {}: {}", dir.display(), e)))?;
        log::debug!("Removed workspace {}", dir.display());
        Ok(())
    }

    pub fn exists(&self, session_id: &str) -> bool {
        self.path(session_id).exists()
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn path(&self, session_id: &str) -> PathBuf {
        self.base_path.join(session_id)
    }

    /// Session ids with a workspace on disk (left behind by crashed runs).
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }
        let mut sessions: Vec<String> = fs::read_dir(&self.base_path)?
            .flatten()
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        sessions.sort();
        Ok(sessions)
    }
}
