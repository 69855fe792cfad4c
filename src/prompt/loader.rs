//! Prompt Loader - Load and cache prompt template overrides from a directory

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{FixloopError, Result};

/// Template file extension
const TEMPLATE_EXT: &str = "hbs";

/// Loads and caches prompt templates from a directory
pub struct PromptLoader {
    templates_dir: PathBuf,
    cache: RwLock<HashMap<String, String>>,
}

impl PromptLoader {
    pub fn new(templates_dir: impl AsRef<Path>) -> Self {
        Self {
            templates_dir: templates_dir.as_ref().to_path_buf(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Load `<templates_dir>/<name>.hbs`, caching the content.
    pub fn load(&self, name: &str) -> Result<String> {
        {
            let cache = self
                .cache
                .read()
                .map_err(|e| FixloopError::Storage(format!("Failed to acquire read lock: {}", e)))?;
            if let Some(content) = cache.get(name) {
                return Ok(content.clone());
            }
        }

        let path = self.template_path(name);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            FixloopError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to load template '{}' from {:?}: {}", name, path, e),
            ))
        })?;

        {
            let mut cache = self
                .cache
                .write()
                .map_err(|e| FixloopError::Storage(format!("Failed to acquire write lock: {}", e)))?;
            cache.insert(name.to_string(), content.clone());
        }

        log::debug!("Loaded prompt template {}", path.display());
        Ok(content)
    }

    /// Check if a template exists on disk
    pub fn exists(&self, name: &str) -> bool {
        self.template_path(name).is_file()
    }

    fn template_path(&self, name: &str) -> PathBuf {
        self.templates_dir.join(format!("{}.{}", name, TEMPLATE_EXT))
    }

    pub fn templates_dir(&self) -> &Path {
        &self.templates_dir
    }
}
