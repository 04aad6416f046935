use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Errors returned by [`KeyedFetchCache`](crate::KeyedFetchCache) operations.
///
/// The cache never retries or rewrites a failure: the producer's error comes
/// back as [`CacheError::Fetch`] and backend failures as [`CacheError::Store`].
/// Every caller waiting on the same key receives a clone of the same error.
#[derive(Debug, Clone, Error)]
pub enum CacheError<E> {
    /// The injected fetch operation failed.
    #[error("{0}")]
    Fetch(E),
    /// The store failed to load or save the value.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The query could not be turned into a key.
    #[error(transparent)]
    Key(#[from] KeyError),
}

impl<E> CacheError<E> {
    /// Returns the producer's error, if this is a fetch failure.
    pub fn as_fetch(&self) -> Option<&E> {
        match self {
            CacheError::Fetch(err) => Some(err),
            _ => None,
        }
    }

    /// Consumes the error, returning the producer's error if there is one.
    pub fn into_fetch(self) -> Option<E> {
        match self {
            CacheError::Fetch(err) => Some(err),
            _ => None,
        }
    }
}

/// A failure reported by a [`Store`](crate::Store) backend.
///
/// The backend error is kept behind an `Arc` so a single failure can be
/// handed to every waiter of a flight.
#[derive(Clone, Error)]
#[error("cache store error: {source}")]
pub struct StoreError {
    source: Arc<dyn StdError + Send + Sync>,
}

impl StoreError {
    /// Wraps a backend error.
    pub fn new<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            source: Arc::new(err),
        }
    }

    /// Creates a store error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            source: Arc::new(Message(message.into())),
        }
    }
}

impl fmt::Debug for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StoreError").field(&self.source).finish()
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);

/// Convenience alias for store results.
pub type StoreResult<T> = Result<T, StoreError>;

/// Key derivation failed.
#[derive(Debug, Clone, Error)]
pub enum KeyError {
    /// The query could not be serialized to JSON.
    #[error("failed to serialize query: {0}")]
    Serialize(#[source] Arc<serde_json::Error>),
}

impl From<serde_json::Error> for KeyError {
    fn from(err: serde_json::Error) -> Self {
        KeyError::Serialize(Arc::new(err))
    }
}
