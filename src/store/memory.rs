//! In-process fix caches.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{CacheStats, FixCache};
use crate::error::{FixloopError, Result};
use crate::propose::FixCandidate;

/// Volatile [`FixCache`] backed by a map.
#[derive(Debug, Default)]
pub struct MemoryFixCache {
    entries: Mutex<HashMap<String, (FixCandidate, u64)>>,
}

impl MemoryFixCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, (FixCandidate, u64)>>> {
        self.entries
            .lock()
            .map_err(|e| FixloopError::Storage(format!("Failed to acquire cache lock: {}", e)))
    }
}

impl FixCache for MemoryFixCache {
    fn get(&self, key: &str) -> Result<Option<FixCandidate>> {
        let mut entries = self.lock()?;
        Ok(entries.get_mut(key).map(|(candidate, hits)| {
            *hits += 1;
            candidate.clone()
        }))
    }

    fn put(&self, key: &str, candidate: &FixCandidate) -> Result<()> {
        self.lock()?.insert(key.to_string(), (candidate.clone(), 0));
        Ok(())
    }

    fn stats(&self) -> Result<CacheStats> {
        let entries = self.lock()?;
        Ok(CacheStats {
            entries: entries.len() as u64,
            hits: entries.values().map(|(_, hits)| hits).sum(),
        })
    }

    fn clear(&self) -> Result<u64> {
        let mut entries = self.lock()?;
        let removed = entries.len() as u64;
        entries.clear();
        Ok(removed)
    }
}

/// Cache that never stores anything (`--no-cache`, `cache.enabled: false`).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFixCache;

impl FixCache for NoFixCache {
    fn get(&self, _key: &str) -> Result<Option<FixCandidate>> {
        Ok(None)
    }

    fn put(&self, _key: &str, _candidate: &FixCandidate) -> Result<()> {
        Ok(())
    }

    fn stats(&self) -> Result<CacheStats> {
        Ok(CacheStats::default())
    }

    fn clear(&self) -> Result<u64> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cache_hits() {
        let cache = MemoryFixCache::new();
        let candidate = FixCandidate {
            explanation: None,
            code: "x\n".to_string(),
        };
        cache.put("k", &candidate).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some(candidate));
        assert!(cache.get("other").unwrap().is_none());
        assert_eq!(cache.stats().unwrap(), CacheStats { entries: 1, hits: 1 });
        assert_eq!(cache.clear().unwrap(), 1);
    }

    #[test]
    fn test_no_cache_never_stores() {
        let cache = NoFixCache;
        let candidate = FixCandidate {
            explanation: None,
            code: "x\n".to_string(),
        };
        cache.put("k", &candidate).unwrap();
        assert!(cache.get("k").unwrap().is_none());
    }
}
