//! Fix cache storage.
//!
//! Proposed fixes are persisted under the 64-character hex digest of
//! (source, error record, language), one row per key. A cache failure is
//! never fatal to a session: callers log it and treat it as a miss.

mod memory;
mod sqlite;

pub use memory::{MemoryFixCache, NoFixCache};
pub use sqlite::SqliteFixCache;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::propose::FixCandidate;

/// Entry and hit counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: u64,
    pub hits: u64,
}

/// Keyed persistence for fix candidates.
pub trait FixCache: Send + Sync {
    /// Look up a candidate; counts a hit when found.
    fn get(&self, key: &str) -> Result<Option<FixCandidate>>;

    /// Store or replace the candidate for `key`.
    fn put(&self, key: &str, candidate: &FixCandidate) -> Result<()>;

    fn stats(&self) -> Result<CacheStats>;

    /// Remove every entry, returning how many were removed.
    fn clear(&self) -> Result<u64>;
}
