//! Cache keys identifying versions of target sets

use crate::hash::hash_all;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fingerprint carried by keys that must never be cached or persisted.
pub const UNCACHEABLE_FINGERPRINT: &str = "__UNCACHEABLE_HASH__";

/// A `CacheKey` represents some version of a set of targets.
///
/// - `id` identifies the set of targets.
/// - `fingerprint` covers all invalidating inputs to the build step, i.e. it uniquely
///   determines a given version of the artifacts created when building the target set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    id: String,
    fingerprint: String,
}

impl CacheKey {
    /// Create a key from an id and a fingerprint
    ///
    /// Persisted fingerprints are whitespace-trimmed on read, so only fingerprints
    /// without leading or trailing whitespace survive a round trip through a
    /// [`BuildInvalidator`](crate::BuildInvalidator).
    #[must_use]
    pub fn new(id: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fingerprint: fingerprint.into(),
        }
    }

    /// Create a key that is never cacheable
    #[must_use]
    pub fn uncacheable(id: impl Into<String>) -> Self {
        Self::new(id, UNCACHEABLE_FINGERPRINT)
    }

    /// Combine the keys of several target sets into a key for their union.
    ///
    /// A single key is returned unchanged. Otherwise the combined id comes from
    /// [`combine_ids`] and the combined fingerprint hashes the sorted member
    /// fingerprints, so the result does not depend on input order. If any member
    /// is uncacheable the combination is uncacheable too.
    ///
    /// Combination is commutative but not associative: `combine([combine([a, b]), c])`
    /// generally differs from `combine([a, combine([b, c])])`. Combine the full flat
    /// set of keys in one call.
    ///
    /// # Panics
    ///
    /// Panics if `keys` is empty.
    #[must_use]
    pub fn combine(keys: &[Self]) -> Self {
        assert!(!keys.is_empty(), "cannot combine an empty set of cache keys");
        if let [key] = keys {
            return key.clone();
        }

        let id = combine_ids(keys.iter().map(|key| key.id.as_str()));
        if keys.iter().any(|key| !key.is_cacheable()) {
            return Self::uncacheable(id);
        }

        let mut fingerprints: Vec<&str> = keys.iter().map(|key| key.fingerprint.as_str()).collect();
        fingerprints.sort_unstable();
        Self::new(id, hash_all(fingerprints))
    }

    /// The id of the target set this key versions
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The fingerprint of this version of the target set
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Whether artifacts associated with this key may be cached
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        self.fingerprint != UNCACHEABLE_FINGERPRINT
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.fingerprint)
    }
}

/// Merge target ids into one id, independent of their order.
///
/// A lone id is kept as is so single-target keys stay readable; several ids are
/// sorted and hashed.
pub fn combine_ids<'a, I>(ids: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut ids: Vec<&str> = ids.into_iter().collect();
    if let [id] = ids.as_slice() {
        return (*id).to_string();
    }
    ids.sort_unstable();
    hash_all(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: &str, fingerprint: &str) -> CacheKey {
        CacheKey::new(id, fingerprint)
    }

    #[test]
    fn uncacheable_key_is_not_cacheable() {
        let k = CacheKey::uncacheable("src/app:bin");
        assert!(!k.is_cacheable());
        assert_eq!(k.id(), "src/app:bin");
        assert_eq!(k.fingerprint(), UNCACHEABLE_FINGERPRINT);
    }

    #[test]
    fn generated_key_is_cacheable() {
        assert!(key("a", "abc_123").is_cacheable());
    }

    #[test]
    fn combine_singleton_is_identity() {
        let k = key("T1", "fa");
        assert_eq!(CacheKey::combine(std::slice::from_ref(&k)), k);
    }

    #[test]
    fn combine_is_order_independent() {
        let t1 = key("T1", "fa");
        let t2 = key("T2", "fb");
        let forward = CacheKey::combine(&[t1.clone(), t2.clone()]);
        let backward = CacheKey::combine(&[t2, t1]);
        assert_eq!(forward, backward);
        assert_eq!(forward.fingerprint(), hash_all(["fa", "fb"]));
        assert_eq!(forward.id(), hash_all(["T1", "T2"]));
    }

    #[test]
    fn combine_with_uncacheable_member_is_uncacheable() {
        let combined = CacheKey::combine(&[key("a", "fa"), CacheKey::uncacheable("b")]);
        assert!(!combined.is_cacheable());
        assert_eq!(combined.id(), combine_ids(["a", "b"]));
    }

    #[test]
    #[should_panic(expected = "empty set of cache keys")]
    fn combine_empty_panics() {
        let _ = CacheKey::combine(&[]);
    }

    #[test]
    fn combine_ids_keeps_single_id_readable() {
        assert_eq!(combine_ids(["src/lib:lib"]), "src/lib:lib");
    }

    #[test]
    fn display_joins_id_and_fingerprint() {
        assert_eq!(key("a", "f").to_string(), "a@f");
    }

    #[test]
    fn serde_roundtrip_keeps_fields() {
        let k = key("src/app:bin", "h1_0123456789ab");
        let json = serde_json::to_string(&k).unwrap();
        assert!(json.contains("\"fingerprint\""));
        let parsed: CacheKey = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, k);
    }
}
