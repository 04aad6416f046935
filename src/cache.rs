use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::config::{CacheBuilder, CacheConfig};
use crate::debug::{CacheEvent, CacheObserver, DebugMode};
use crate::error::{CacheError, KeyError};
use crate::hasher::{JsonDigest, KeyHasher};
use crate::store::Store;

type Outcome<V, E> = Result<V, CacheError<E>>;

/// The outstanding fetch for one key and the callers waiting on it.
struct Flight<V, E> {
    waiters: VecDeque<oneshot::Sender<Outcome<V, E>>>,
}

type FlightMap<V, E> = Mutex<HashMap<String, Flight<V, E>>>;

/// A keyed get-or-fetch cache that runs at most one fetch per key at a time.
///
/// Each call to [`fetch`](Self::fetch) derives a key from its query. If a
/// fetch for that key is already in flight, the caller joins its queue and
/// receives the same outcome. Otherwise the caller leads: it asks the store
/// for a fresh value and, on a miss, invokes the producer and saves the
/// result for the configured expiry window. When the leader settles, every
/// queued caller is released in arrival order with a clone of its result.
///
/// Failures are never cached. A failed fetch leaves any previously stored
/// value untouched, and the next call for the key starts a new fetch.
pub struct KeyedFetchCache<Q, V, E, F, H = JsonDigest> {
    fetch: F,
    hasher: H,
    config: CacheConfig,
    store: Arc<dyn Store<V>>,
    observer: Arc<dyn CacheObserver>,
    flights: FlightMap<V, E>,
    _query: PhantomData<fn(Q)>,
}

impl<Q, V, E, F> KeyedFetchCache<Q, V, E, F> {
    /// Starts building a cache around `fetch`, which is invoked with the query
    /// and its derived key.
    pub fn builder<Fut>(fetch: F) -> CacheBuilder<Q, V, E, F>
    where
        F: Fn(Q, String) -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        CacheBuilder::new(fetch)
    }

    /// Creates a cache with default options: JSON digest keys, in-memory
    /// store, one hour expiry, no debug events.
    pub fn new<Fut>(fetch: F) -> Self
    where
        F: Fn(Q, String) -> Fut,
        Fut: Future<Output = Result<V, E>>,
        Q: serde::Serialize,
        V: Clone + Send + 'static,
    {
        Self::builder(fetch).build()
    }
}

impl<Q, V, E, F, H> KeyedFetchCache<Q, V, E, F, H> {
    pub(crate) fn from_parts(
        fetch: F,
        hasher: H,
        config: CacheConfig,
        store: Arc<dyn Store<V>>,
        observer: Arc<dyn CacheObserver>,
    ) -> Self {
        Self {
            fetch,
            hasher,
            config,
            store,
            observer,
            flights: Mutex::new(HashMap::new()),
            _query: PhantomData,
        }
    }

    pub fn expire(&self) -> Duration {
        self.config.expire
    }

    pub fn debug_mode(&self) -> &DebugMode {
        &self.config.debug
    }

    /// Number of keys with a fetch currently in flight.
    pub fn in_flight(&self) -> usize {
        self.flights.lock().len()
    }

    fn emit(&self, event: CacheEvent, key: &str) {
        if self.config.debug.is_enabled() {
            self.observer.observe(event, key, self.config.debug.tag());
        }
    }

    /// Queues the caller behind the in-flight fetch for `key`, or registers a
    /// new flight and returns `None` if there is none.
    fn join_or_lead(&self, key: &str) -> Option<oneshot::Receiver<Outcome<V, E>>> {
        let mut flights = self.flights.lock();
        match flights.get_mut(key) {
            Some(flight) => {
                let (sender, receiver) = oneshot::channel();
                flight.waiters.push_back(sender);
                Some(receiver)
            }
            None => {
                flights.insert(
                    key.to_owned(),
                    Flight {
                        waiters: VecDeque::new(),
                    },
                );
                None
            }
        }
    }
}

impl<Q, V, E, F, H> KeyedFetchCache<Q, V, E, F, H>
where
    H: KeyHasher<Q>,
{
    /// Derives the cache key for `query`.
    pub fn key_for(&self, query: &Q) -> Result<String, KeyError> {
        self.hasher.hash(query)
    }

    /// Returns the cached value for `query`, fetching it if there is none.
    ///
    /// Concurrent calls for the same key share a single invocation of the
    /// producer and all receive its result or error.
    pub async fn fetch<Fut>(&self, query: Q) -> Result<V, CacheError<E>>
    where
        F: Fn(Q, String) -> Fut,
        Fut: Future<Output = Result<V, E>>,
        V: Clone,
        E: Clone,
    {
        let key = self.hasher.hash(&query)?;
        let mut queued = false;

        loop {
            let Some(receiver) = self.join_or_lead(&key) else {
                tracing::trace!(key = key.as_str(), "leading fetch");
                let flight = FlightGuard::new(&self.flights, &key);
                let outcome = self.load_or_fetch(query, &key).await;
                flight.settle(&outcome);
                return outcome;
            };

            if !queued {
                self.emit(CacheEvent::Queued, &key);
                queued = true;
            }

            match receiver.await {
                Ok(outcome) => return outcome,
                // The leader was dropped before settling; compete again.
                Err(_) => tracing::trace!(key = key.as_str(), "in-flight fetch abandoned, retrying"),
            }
        }
    }

    /// Invalidates the cached value for `query`.
    ///
    /// Returns whether a live value was removed. A fetch already in flight
    /// for the key is not cancelled and will store its result when it
    /// completes.
    pub async fn flush(&self, query: &Q) -> Result<bool, CacheError<E>> {
        let key = self.hasher.hash(query)?;
        let removed = self.store.remove(&key).await?;
        tracing::trace!(key = key.as_str(), removed, "flushed");
        Ok(removed)
    }

    async fn load_or_fetch<Fut>(&self, query: Q, key: &str) -> Outcome<V, E>
    where
        F: Fn(Q, String) -> Fut,
        Fut: Future<Output = Result<V, E>>,
        V: Clone,
    {
        if let Some(value) = self.store.load(key).await? {
            self.emit(CacheEvent::Hit, key);
            return Ok(value);
        }

        self.emit(CacheEvent::Miss, key);
        let value = (self.fetch)(query, key.to_owned())
            .await
            .map_err(CacheError::Fetch)?;
        self.store
            .save(key, value.clone(), self.config.expire)
            .await?;
        Ok(value)
    }
}

/// Owns the in-flight slot of a leading caller.
///
/// [`settle`](Self::settle) releases the slot and the queued waiters. If the
/// leader is dropped first, the slot is released and the waiters' channels
/// close, so one of them takes over.
struct FlightGuard<'a, V, E> {
    flights: &'a FlightMap<V, E>,
    key: &'a str,
    settled: bool,
}

impl<'a, V, E> FlightGuard<'a, V, E> {
    fn new(flights: &'a FlightMap<V, E>, key: &'a str) -> Self {
        Self {
            flights,
            key,
            settled: false,
        }
    }

    fn settle(mut self, outcome: &Outcome<V, E>)
    where
        V: Clone,
        E: Clone,
    {
        self.settled = true;
        let flight = self.flights.lock().remove(self.key);
        let Some(flight) = flight else {
            return;
        };

        tracing::trace!(
            key = self.key,
            waiters = flight.waiters.len(),
            ok = outcome.is_ok(),
            "settling fetch"
        );
        for waiter in flight.waiters {
            // A waiter that gave up has dropped its receiver.
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl<V, E> Drop for FlightGuard<'_, V, E> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(flight) = self.flights.lock().remove(self.key) {
            tracing::trace!(
                key = self.key,
                waiters = flight.waiters.len(),
                "fetch dropped before settling"
            );
        }
    }
}
