//! Transition events and the optional JSONL journal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::state::SessionState;
use crate::error::Result;

/// One state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub timestamp: DateTime<Utc>,
    pub attempt: u32,
    pub from: SessionState,
    pub to: SessionState,
    pub detail: String,
}

impl SessionEvent {
    pub fn new(attempt: u32, from: SessionState, to: SessionState, detail: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            attempt,
            from,
            to,
            detail: detail.into(),
        }
    }
}

/// Append-only `<dir>/<session-id>.jsonl` event log.
#[derive(Debug, Clone)]
pub struct SessionJournal {
    path: PathBuf,
}

impl SessionJournal {
    pub fn open(dir: &Path, session_id: &str) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(format!("{}.jsonl", session_id)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, event: &SessionEvent) -> Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(event)?)?;
        Ok(())
    }
}
