//! TTL cache with per-key request coalescing
//!
//! Entries expire lazily: age is measured from write time and checked only
//! on access. Simultaneous misses for the same key are coalesced through a
//! per-key async mutex so at most one recomputation runs; waiters pick up
//! the freshly written entry instead of issuing their own.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use services_common::DEVIATION_CACHE_TTL_SECS;

type Key = (String, u32);

struct CacheEntry<T> {
    value: T,
    created_at: Instant,
}

/// Operational cache statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Live entry count (including expired-but-unevicted entries)
    pub entries: usize,
    /// Entry keys as "asset_periodd" strings
    pub keys: Vec<String>,
    /// Configured TTL in seconds
    pub ttl_seconds: u64,
}

/// TTL-bounded memoization for expensive deviation computations
pub struct DeviationCache<T: Clone> {
    entries: DashMap<Key, CacheEntry<T>>,
    locks: DashMap<Key, Arc<tokio::sync::Mutex<()>>>,
    ttl: Duration,
}

impl<T: Clone> Default for DeviationCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> DeviationCache<T> {
    /// Cache with the standard 300 s TTL
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(DEVIATION_CACHE_TTL_SECS))
    }

    /// Cache with a custom TTL
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            locks: DashMap::new(),
            ttl,
        }
    }

    fn fresh(&self, key: &Key) -> Option<T> {
        self.entries
            .get(key)
            .filter(|entry| entry.created_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone())
    }

    /// Return the cached value for `(asset, period_days)` or run `compute`
    ///
    /// A fresh entry is returned unchanged with no side effects. On a miss
    /// (or expiry) the computed value overwrites the entry with the current
    /// timestamp. Concurrent misses for the same key run `compute` at most
    /// once.
    ///
    /// # Errors
    ///
    /// Propagates whatever `compute` returns; nothing is cached on error.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        asset: &str,
        period_days: u32,
        compute: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = (asset.to_string(), period_days);

        if let Some(value) = self.fresh(&key) {
            debug!(asset, period_days, "deviation cache hit");
            return Ok(value);
        }

        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // A coalesced caller may have filled the entry while we waited
        if let Some(value) = self.fresh(&key) {
            debug!(asset, period_days, "deviation cache hit after coalesce");
            return Ok(value);
        }

        debug!(asset, period_days, "deviation cache miss, computing");
        let value = compute().await?;
        self.entries.insert(
            key,
            CacheEntry {
                value: value.clone(),
                created_at: Instant::now(),
            },
        );
        Ok(value)
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.clear();
        self.locks.clear();
    }

    /// Entry count, keys and TTL for operational visibility
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .map(|entry| format!("{}_{}d", entry.key().0, entry.key().1))
            .collect();
        keys.sort();

        CacheStats {
            entries: self.entries.len(),
            keys,
            ttl_seconds: self.ttl.as_secs(),
        }
    }
}
