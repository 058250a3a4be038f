//! Interfaces to the dependency graph that supplies target fingerprints

/// A unit of buildable work whose fingerprints are computed by the dependency graph.
///
/// This crate never hashes sources itself; it only mixes the digests a target
/// reports into cache keys.
pub trait Target {
    /// Stable id of the target, unique within one invalidator scope.
    fn id(&self) -> &str;

    /// Fingerprint of the target's own inputs, or `None` if it cannot be fingerprinted.
    fn invalidation_hash(&self, strategy: Option<&dyn FingerprintStrategy<Self>>) -> Option<String>;

    /// Fingerprint of the target and its full dependency closure, or `None` if it
    /// cannot be fingerprinted.
    fn transitive_invalidation_hash(
        &self,
        strategy: Option<&dyn FingerprintStrategy<Self>>,
    ) -> Option<String>;
}

/// Policy customizing what about a target is fingerprinted.
///
/// Tasks use a strategy to hash additional attributes or to exclude ones they do
/// not care about. Key generators pass it through to the target untouched.
pub trait FingerprintStrategy<T: ?Sized> {
    /// Fingerprint `target` under this strategy, or `None` to opt it out of caching.
    fn compute_fingerprint(&self, target: &T) -> Option<String>;
}
