//! Construction-time options for [`KeyedFetchCache`].

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::KeyedFetchCache;
use crate::debug::{CacheObserver, DebugMode, TracingObserver};
use crate::hasher::{JsonDigest, KeyHasher, SingleSlot};
use crate::store::{MemoryStore, Store};

/// One hour.
pub const DEFAULT_EXPIRE: Duration = Duration::from_secs(60 * 60);

/// Plain-data cache options, suitable for loading from a config file.
///
/// ```
/// use std::time::Duration;
/// use singleflight_cache::{CacheConfig, DebugMode};
///
/// let config: CacheConfig = serde_json::from_str(r#"{"debug": "users", "expire": "90s"}"#).unwrap();
/// assert_eq!(config.debug, DebugMode::Tagged("users".into()));
/// assert_eq!(config.expire, Duration::from_secs(90));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Debug event reporting.
    pub debug: DebugMode,
    /// How long a fetched value stays valid.
    #[serde(with = "humantime_serde")]
    pub expire: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            debug: DebugMode::Off,
            expire: DEFAULT_EXPIRE,
        }
    }
}

/// Builder for [`KeyedFetchCache`], created by [`KeyedFetchCache::builder`].
///
/// `H` is the key hasher; it starts as [`JsonDigest`] and is replaced by
/// [`hasher`](Self::hasher) or [`single_slot`](Self::single_slot).
pub struct CacheBuilder<Q, V, E, F, H = JsonDigest> {
    fetch: F,
    hasher: H,
    config: CacheConfig,
    store: Option<Arc<dyn Store<V>>>,
    observer: Option<Arc<dyn CacheObserver>>,
    _phantom: PhantomData<fn(Q) -> E>,
}

impl<Q, V, E, F> CacheBuilder<Q, V, E, F> {
    pub(crate) fn new(fetch: F) -> Self {
        Self {
            fetch,
            hasher: JsonDigest,
            config: CacheConfig::default(),
            store: None,
            observer: None,
            _phantom: PhantomData,
        }
    }
}

impl<Q, V, E, F, H> CacheBuilder<Q, V, E, F, H> {
    /// Replaces all plain-data options at once.
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets how long a fetched value stays valid. Defaults to one hour.
    pub fn expire(mut self, expire: Duration) -> Self {
        self.config.expire = expire;
        self
    }

    /// Sets debug event reporting: `false`, `true` or a tag.
    pub fn debug(mut self, debug: impl Into<DebugMode>) -> Self {
        self.config.debug = debug.into();
        self
    }

    /// Sets the storage backend. Defaults to a [`MemoryStore`].
    pub fn store<S>(mut self, store: S) -> Self
    where
        S: Store<V> + 'static,
    {
        self.store = Some(Arc::new(store));
        self
    }

    /// Shares a storage backend with other owners.
    pub fn shared_store(mut self, store: Arc<dyn Store<V>>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the receiver of debug events. Defaults to [`TracingObserver`].
    pub fn observer<O>(mut self, observer: O) -> Self
    where
        O: CacheObserver + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Sets the function mapping queries to keys.
    pub fn hasher<H2>(self, hasher: H2) -> CacheBuilder<Q, V, E, F, H2>
    where
        H2: KeyHasher<Q>,
    {
        CacheBuilder {
            fetch: self.fetch,
            hasher,
            config: self.config,
            store: self.store,
            observer: self.observer,
            _phantom: PhantomData,
        }
    }

    /// Uses a single cache slot keyed by the empty string.
    pub fn single_slot(self) -> CacheBuilder<Q, V, E, F, SingleSlot> {
        self.hasher(SingleSlot)
    }

    pub fn build(self) -> KeyedFetchCache<Q, V, E, F, H>
    where
        V: Clone + Send + 'static,
        H: KeyHasher<Q>,
    {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::<V>::new()));
        let observer = self
            .observer
            .unwrap_or_else(|| Arc::new(TracingObserver));
        KeyedFetchCache::from_parts(self.fetch, self.hasher, self.config, store, observer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.debug, DebugMode::Off);
        assert_eq!(config.expire, Duration::from_secs(3600));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: CacheConfig = serde_json::from_str(r#"{"expire": "100ms"}"#).unwrap();
        assert_eq!(config.expire, Duration::from_millis(100));
        assert_eq!(config.debug, DebugMode::Off);

        let config: CacheConfig = serde_json::from_str(r#"{"debug": true}"#).unwrap();
        assert_eq!(config.debug, DebugMode::On);
        assert_eq!(config.expire, DEFAULT_EXPIRE);
    }

    #[test]
    fn test_invalid_expire_is_rejected() {
        let result = serde_json::from_str::<CacheConfig>(r#"{"expire": "soon"}"#);
        assert!(result.is_err());
    }
}
