//! Cache key generation for targets

use crate::key::CacheKey;
use crate::target::{FingerprintStrategy, Target};
use sha2::{Digest, Sha256};

/// Number of hex characters of the seed digest appended to every fingerprint.
pub const KEY_SUFFIX_LEN: usize = 12;

/// Generates cache keys for versions of target sets.
///
/// A key for a set of targets is obtained by passing the individual keys to
/// [`CacheKey::combine`].
pub trait CacheKeyGenerator {
    /// Get a key representing the given target and its inputs.
    ///
    /// With `transitive` the fingerprint covers the target's whole dependency
    /// closure. `strategy` is forwarded to the target to customize what is hashed.
    /// Returns `None` when the target cannot be fingerprinted; callers should then
    /// skip caching for this unit altogether.
    fn key_for_target<T: Target + ?Sized>(
        &self,
        target: &T,
        transitive: bool,
        strategy: Option<&dyn FingerprintStrategy<T>>,
    ) -> Option<CacheKey>;
}

/// Generator seeded with the schema version and generator-specific inputs.
///
/// The seed is mixed into every key so that changing the schema version or any
/// base input invalidates all keys this generator produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardKeyGenerator {
    key_suffix: String,
}

impl StandardKeyGenerator {
    /// Seed a generator from the schema version and base fingerprint inputs
    /// (tool versions, options, ...). Input order matters.
    ///
    /// The version and inputs are hashed as one concatenated byte stream, so only
    /// the bytes count, not how they are split: `["ab"]` and `["a", "b"]` seed the
    /// same suffix.
    pub fn new<I, B>(schema_version: &str, base_inputs: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let mut hasher = Sha256::new();
        hasher.update(schema_version.as_bytes());
        for input in base_inputs {
            hasher.update(input.as_ref());
        }
        let mut key_suffix = hex::encode(hasher.finalize());
        key_suffix.truncate(KEY_SUFFIX_LEN);
        tracing::debug!(schema_version, key_suffix = %key_suffix, "Seeded cache key generator");
        Self { key_suffix }
    }

    /// Suffix appended to every fingerprint this generator produces
    #[must_use]
    pub fn key_suffix(&self) -> &str {
        &self.key_suffix
    }
}

impl CacheKeyGenerator for StandardKeyGenerator {
    fn key_for_target<T: Target + ?Sized>(
        &self,
        target: &T,
        transitive: bool,
        strategy: Option<&dyn FingerprintStrategy<T>>,
    ) -> Option<CacheKey> {
        let target_key = if transitive {
            target.transitive_invalidation_hash(strategy)
        } else {
            target.invalidation_hash(strategy)
        };
        let Some(target_key) = target_key else {
            tracing::trace!(id = target.id(), "Target has no fingerprint; not generating a key");
            return None;
        };
        Some(CacheKey::new(
            target.id(),
            format!("{target_key}_{}", self.key_suffix),
        ))
    }
}

/// Generator that always returns uncacheable keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UncacheableKeyGenerator;

impl CacheKeyGenerator for UncacheableKeyGenerator {
    fn key_for_target<T: Target + ?Sized>(
        &self,
        target: &T,
        _transitive: bool,
        _strategy: Option<&dyn FingerprintStrategy<T>>,
    ) -> Option<CacheKey> {
        Some(CacheKey::uncacheable(target.id()))
    }
}

/// Whether a unit of work may be cached at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachePolicy {
    /// Produce real, cacheable keys
    #[default]
    Cacheable,
    /// Produce uncacheable keys, e.g. for tools with non-deterministic output
    Disabled,
}

/// A key generator selected at runtime from a [`CachePolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyGenerator {
    /// Seeded generator producing cacheable keys
    Standard(StandardKeyGenerator),
    /// Generator producing uncacheable keys
    Uncacheable(UncacheableKeyGenerator),
}

impl KeyGenerator {
    /// Build the generator matching `policy`. Base inputs are ignored when caching
    /// is disabled.
    pub fn for_policy<I, B>(policy: CachePolicy, schema_version: &str, base_inputs: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        match policy {
            CachePolicy::Cacheable => {
                Self::Standard(StandardKeyGenerator::new(schema_version, base_inputs))
            }
            CachePolicy::Disabled => Self::Uncacheable(UncacheableKeyGenerator),
        }
    }
}

impl CacheKeyGenerator for KeyGenerator {
    fn key_for_target<T: Target + ?Sized>(
        &self,
        target: &T,
        transitive: bool,
        strategy: Option<&dyn FingerprintStrategy<T>>,
    ) -> Option<CacheKey> {
        match self {
            Self::Standard(generator) => generator.key_for_target(target, transitive, strategy),
            Self::Uncacheable(generator) => generator.key_for_target(target, transitive, strategy),
        }
    }
}
