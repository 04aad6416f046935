//! Storage backends for fetched values.
//!
//! A [`Store`] owns the cached values and decides their freshness. The cache
//! only ever talks to it through `load`, `save` and `remove`, so a shared
//! backend (Redis, a database table, ...) can be dropped in without the cache
//! changing. [`MemoryStore`] is the process-local default.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::StoreResult;

/// An asynchronous key-value backend with per-entry expiry.
///
/// Implementations must be safe to call concurrently for different keys. The
/// cache never issues overlapping `load`/`save` calls for the same key.
#[async_trait]
pub trait Store<V>: Send + Sync {
    /// Returns the live value for `key`, or `None` if it is absent or expired.
    async fn load(&self, key: &str) -> StoreResult<Option<V>>;

    /// Stores `value` under `key`, valid for `ttl`.
    async fn save(&self, key: &str, value: V, ttl: Duration) -> StoreResult<()>;

    /// Removes `key`. Returns whether a live entry was removed.
    async fn remove(&self, key: &str) -> StoreResult<bool>;
}

#[derive(Debug, Clone)]
struct Stored<V> {
    value: V,
    fetched_at: Instant,
    ttl: Duration,
}

impl<V> Stored<V> {
    /// Fresh while `now - fetched_at <= ttl`.
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) <= self.ttl
    }
}

/// A process-local store backed by a mutex-protected `HashMap`.
///
/// Timestamps come from [`tokio::time::Instant`], so a paused test clock
/// drives expiry. Expired entries are dropped when they are next loaded or
/// by [`MemoryStore::purge_expired`].
#[derive(Debug)]
pub struct MemoryStore<V> {
    map: Mutex<HashMap<String, Stored<V>>>,
}

impl<V> MemoryStore<V> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            map: Mutex::new(HashMap::new()),
        }
    }

    /// Number of entries held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.lock().is_empty()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.map.lock().clear();
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut map = self.map.lock();
        let before = map.len();
        map.retain(|_, stored| stored.is_fresh(now));
        let purged = before - map.len();
        if purged > 0 {
            tracing::trace!(purged, "swept expired entries");
        }
        purged
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> Store<V> for MemoryStore<V>
where
    V: Clone + Send + 'static,
{
    async fn load(&self, key: &str) -> StoreResult<Option<V>> {
        let now = Instant::now();
        let mut map = self.map.lock();
        match map.get(key) {
            Some(stored) if stored.is_fresh(now) => Ok(Some(stored.value.clone())),
            Some(_) => {
                map.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn save(&self, key: &str, value: V, ttl: Duration) -> StoreResult<()> {
        let stored = Stored {
            value,
            fetched_at: Instant::now(),
            ttl,
        };
        self.map.lock().insert(key.to_owned(), stored);
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<bool> {
        let now = Instant::now();
        let removed = self.map.lock().remove(key);
        Ok(removed.is_some_and(|stored| stored.is_fresh(now)))
    }
}
