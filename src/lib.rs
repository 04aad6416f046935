//! A keyed async fetch cache with single-flight de-duplication and expiry.
//!
//! [`KeyedFetchCache`] wraps an asynchronous data producer. Callers ask for
//! the value of a query; the cache derives a key from it and either serves a
//! fresh stored value, joins the fetch already running for that key, or runs
//! the producer itself. However many callers arrive while a key has no fresh
//! value, the producer runs once and everyone gets its result or its error.
//!
//! ```
//! use std::time::Duration;
//! use singleflight_cache::KeyedFetchCache;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache = KeyedFetchCache::builder(|city: String, _key: String| async move {
//!     Ok::<_, String>(format!("forecast for {city}"))
//! })
//! .expire(Duration::from_secs(60))
//! .build();
//!
//! let forecast = cache.fetch("Oslo".to_string()).await.unwrap();
//! assert_eq!(forecast, "forecast for Oslo");
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod debug;
pub mod error;
pub mod hasher;
pub mod store;

pub use cache::KeyedFetchCache;
pub use config::{CacheBuilder, CacheConfig, DEFAULT_EXPIRE};
pub use debug::{CacheEvent, CacheObserver, DebugMode, TracingObserver};
pub use error::{CacheError, KeyError, StoreError, StoreResult};
pub use hasher::{FnHasher, JsonDigest, KeyHasher, SingleSlot};
pub use store::{MemoryStore, Store};

// Re-export async_trait for implementing `Store`
pub use async_trait::async_trait;
