//! Per-file facts cache keyed by path and modification time
//!
//! An entry is valid while the file's modification time matches the one it
//! was stored with. At capacity the least recently stored entry is evicted.

use crate::analysis::facts::TemplateFacts;
use crate::analysis::AnalysisError;
use crate::config::compile_time::analysis::MAX_CACHED_FILES;
use crate::log_debug;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

#[derive(Debug, Clone)]
struct CacheEntry {
    modified: SystemTime,
    facts: TemplateFacts,
    sequence: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatistics {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
    pub evictions: u64,
}

impl CacheStatistics {
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Shared between batch workers
#[derive(Debug)]
pub struct FactsCache {
    entries: Mutex<HashMap<PathBuf, CacheEntry>>,
    capacity: usize,
    sequence: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
    evictions: AtomicU64,
}

impl Default for FactsCache {
    fn default() -> Self {
        Self::new()
    }
}

impl FactsCache {
    pub fn new() -> Self {
        Self::with_capacity(MAX_CACHED_FILES)
    }

    /// Capacity is clamped to at least one entry
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            sequence: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<PathBuf, CacheEntry>>, AnalysisError> {
        self.entries.lock().map_err(|_| AnalysisError::CacheUnavailable)
    }

    /// Cached facts for `path` if they were stored for the same `modified`.
    /// A stale entry is dropped and counted as an invalidation.
    pub fn get(&self, path: &Path, modified: SystemTime) -> Result<Option<TemplateFacts>, AnalysisError> {
        let mut entries = self.lock()?;

        let stale = match entries.get(path) {
            Some(entry) if entry.modified == modified => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(entry.facts.clone()));
            }
            Some(_) => true,
            None => false,
        };

        if stale {
            entries.remove(path);
            self.invalidations.fetch_add(1, Ordering::Relaxed);
            log_debug!("Cached facts are stale", "path" => path.display());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    pub fn insert(
        &self,
        path: &Path,
        modified: SystemTime,
        facts: TemplateFacts,
    ) -> Result<(), AnalysisError> {
        let mut entries = self.lock()?;

        if !entries.contains_key(path) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.sequence)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        entries.insert(
            path.to_path_buf(),
            CacheEntry {
                modified,
                facts,
                sequence,
            },
        );
        Ok(())
    }

    /// Cached facts, or the result of `compute` stored for next time.
    /// The flag is true when the facts came from the cache.
    pub fn get_or_compute<F>(
        &self,
        path: &Path,
        modified: SystemTime,
        compute: F,
    ) -> Result<(TemplateFacts, bool), AnalysisError>
    where
        F: FnOnce() -> TemplateFacts,
    {
        if let Some(facts) = self.get(path, modified)? {
            return Ok((facts, true));
        }

        let facts = compute();
        self.insert(path, modified, facts.clone())?;
        Ok((facts, false))
    }

    /// Returns true if an entry was removed
    pub fn invalidate(&self, path: &Path) -> Result<bool, AnalysisError> {
        let removed = self.lock()?.remove(path).is_some();
        if removed {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
        }
        Ok(removed)
    }

    pub fn clear(&self) -> Result<(), AnalysisError> {
        let mut entries = self.lock()?;
        let dropped = entries.len();
        entries.clear();
        self.invalidations.fetch_add(dropped as u64, Ordering::Relaxed);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn statistics(&self) -> Result<CacheStatistics, AnalysisError> {
        let entries = self.lock()?.len();
        Ok(CacheStatistics {
            entries,
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        })
    }
}
