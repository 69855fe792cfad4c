//! SQLite-backed fix cache.

use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use super::{CacheStats, FixCache};
use crate::error::{FixloopError, Result};
use crate::id::now_ms;
use crate::propose::FixCandidate;

/// Persistent [`FixCache`] in a single SQLite file.
pub struct SqliteFixCache {
    db: Mutex<Connection>,
}

impl SqliteFixCache {
    /// Open or create the cache database at `path`.
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let db = Connection::open(path)?;
        Self::init_schema(&db)?;
        log::debug!("Opened fix cache at {}", path.display());
        Ok(Self { db: Mutex::new(db) })
    }

    pub fn in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        Self::init_schema(&db)?;
        Ok(Self { db: Mutex::new(db) })
    }

    fn init_schema(db: &Connection) -> Result<()> {
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS fixes (
                key TEXT PRIMARY KEY,
                explanation TEXT,
                code TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                hits INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|e| FixloopError::Storage(format!("Failed to acquire cache lock: {}", e)))
    }
}

impl FixCache for SqliteFixCache {
    fn get(&self, key: &str) -> Result<Option<FixCandidate>> {
        let db = self.conn()?;
        let found = db
            .query_row(
                "SELECT explanation, code FROM fixes WHERE key = ?1",
                [key],
                |row| {
                    Ok(FixCandidate {
                        explanation: row.get(0)?,
                        code: row.get(1)?,
                    })
                },
            )
            .optional()?;
        if found.is_some() {
            db.execute("UPDATE fixes SET hits = hits + 1 WHERE key = ?1", [key])?;
        }
        Ok(found)
    }

    fn put(&self, key: &str, candidate: &FixCandidate) -> Result<()> {
        let db = self.conn()?;
        db.execute(
            r#"
            INSERT OR REPLACE INTO fixes (key, explanation, code, created_at, hits)
            VALUES (?1, ?2, ?3, ?4, 0)
            "#,
            params![key, candidate.explanation, candidate.code, now_ms() as i64],
        )?;
        Ok(())
    }

    fn stats(&self) -> Result<CacheStats> {
        let db = self.conn()?;
        let (entries, hits): (i64, i64) = db.query_row(
            "SELECT COUNT(*), COALESCE(SUM(hits), 0) FROM fixes",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(CacheStats {
            entries: entries as u64,
            hits: hits as u64,
        })
    }

    fn clear(&self) -> Result<u64> {
        let db = self.conn()?;
        let removed = db.execute("DELETE FROM fixes", [])?;
        Ok(removed as u64)
    }
}
