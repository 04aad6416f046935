//! Key derivation for cache queries.

use serde::Serialize;
use sha1::{Digest, Sha1};

use crate::error::KeyError;

/// Maps a query to the string key that partitions cache state.
///
/// Implementations must be deterministic: equal queries map to equal keys.
pub trait KeyHasher<Q: ?Sized> {
    /// Derives the key for `query`.
    fn hash(&self, query: &Q) -> Result<String, KeyError>;
}

/// The default hasher: SHA-1 hex digest of the query's JSON serialization.
///
/// Keys are stable for structured queries but unreadable in logs; supply a
/// custom hasher when debug output should show something meaningful.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDigest;

impl<Q> KeyHasher<Q> for JsonDigest
where
    Q: Serialize + ?Sized,
{
    fn hash(&self, query: &Q) -> Result<String, KeyError> {
        let json = serde_json::to_vec(query)?;
        Ok(hex::encode(Sha1::digest(&json)))
    }
}

/// Maps every query to the empty key, giving the cache a single slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleSlot;

impl<Q: ?Sized> KeyHasher<Q> for SingleSlot {
    fn hash(&self, _query: &Q) -> Result<String, KeyError> {
        Ok(String::new())
    }
}

/// Adapts a plain function into a [`KeyHasher`].
///
/// ```
/// use singleflight_cache::{FnHasher, KeyHasher};
///
/// let hasher = FnHasher(|id: &u32| format!("user:{id}"));
/// assert_eq!(hasher.hash(&7).unwrap(), "user:7");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FnHasher<G>(pub G);

impl<Q, G> KeyHasher<Q> for FnHasher<G>
where
    Q: ?Sized,
    G: Fn(&Q) -> String,
{
    fn hash(&self, query: &Q) -> Result<String, KeyError> {
        Ok((self.0)(query))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Serialize)]
    struct Query {
        city: &'static str,
        days: u8,
    }

    #[test]
    fn test_json_digest_is_sha1_of_json() {
        // sha1("null")
        assert_eq!(
            JsonDigest.hash(&()).unwrap(),
            "2be88ca4242c76e8253ac62474851065032d6833"
        );
        assert_eq!(JsonDigest.hash(&"abc").unwrap().len(), 40);
    }

    #[test]
    fn test_json_digest_is_stable() {
        let a = Query {
            city: "Oslo",
            days: 3,
        };
        let b = Query {
            city: "Oslo",
            days: 3,
        };
        let c = Query {
            city: "Oslo",
            days: 4,
        };

        assert_eq!(JsonDigest.hash(&a).unwrap(), JsonDigest.hash(&b).unwrap());
        assert_ne!(JsonDigest.hash(&a).unwrap(), JsonDigest.hash(&c).unwrap());
    }

    #[test]
    fn test_json_digest_rejects_unserializable_query() {
        let mut query = HashMap::new();
        query.insert((1, 2), "tuple keys are not valid JSON object keys");

        let err = JsonDigest.hash(&query).unwrap_err();
        assert!(matches!(err, KeyError::Serialize(_)));
    }

    #[test]
    fn test_single_slot_is_empty() {
        assert_eq!(SingleSlot.hash(&()).unwrap(), "");
        assert_eq!(SingleSlot.hash("anything").unwrap(), "");
    }

    #[test]
    fn test_fn_hasher() {
        let hasher = FnHasher(|q: &Query| format!("{}/{}", q.city, q.days));
        let key = hasher
            .hash(&Query {
                city: "Lima",
                days: 1,
            })
            .unwrap();
        assert_eq!(key, "Lima/1");
    }
}
