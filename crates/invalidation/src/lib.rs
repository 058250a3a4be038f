//! Cache keys and persistent build invalidation for stale
//!
//! This crate decides, for every unit of build work, whether previously produced
//! artifacts are still valid or must be rebuilt:
//! - [`CacheKey`]: an `(id, fingerprint)` pair identifying a version of a target set
//! - [`CacheKeyGenerator`]: derives keys from target fingerprints and a generator seed
//! - [`BuildInvalidator`]: remembers the key of the last successful build per id
//!
//! # Overview
//!
//! A generator turns a target (plus its dependency fingerprints) into a key. The
//! invalidator is consulted with that key to decide whether to skip or rebuild,
//! and is updated with the key once the build succeeds. Artifacts themselves are
//! stored elsewhere, addressed by the key's fingerprint.
//!
//! ```no_run
//! use stale_invalidation::{CacheKeyGenerator, CachePolicy, InvalidationConfig};
//! # use stale_invalidation::{FingerprintStrategy, Target};
//! # struct Lib;
//! # impl Target for Lib {
//! #     fn id(&self) -> &str { "src/lib:lib" }
//! #     fn invalidation_hash(&self, _: Option<&dyn FingerprintStrategy<Self>>) -> Option<String> { Some("h1".into()) }
//! #     fn transitive_invalidation_hash(&self, _: Option<&dyn FingerprintStrategy<Self>>) -> Option<String> { Some("h1".into()) }
//! # }
//! # let target = Lib;
//! let config = InvalidationConfig::from_env();
//! let generator = config.key_generator(CachePolicy::Cacheable, [b"rustc 1.92".as_slice()]);
//! let invalidator = config.invalidator(Some("compile"))?;
//!
//! if let Some(key) = generator.key_for_target(&target, true, None) {
//!     if invalidator.needs_update(&key)? {
//!         // ... build ...
//!         invalidator.update(&key)?;
//!     }
//! }
//! # Ok::<(), stale_invalidation::Error>(())
//! ```

#![expect(
    clippy::missing_errors_doc,
    reason = "All fallible operations return the crate Error; documented on the enum"
)]

pub mod config;
mod error;
pub mod generator;
mod hash;
pub mod invalidator;
pub mod key;
pub mod store;
pub mod target;

// Re-export error types at crate root
pub use error::{Error, Result};

// Re-export main types
pub use config::{DEFAULT_SCHEMA_VERSION, InvalidationConfig};
pub use generator::{
    CacheKeyGenerator, CachePolicy, KeyGenerator, StandardKeyGenerator, UncacheableKeyGenerator,
};
pub use hash::hash_all;
pub use invalidator::BuildInvalidator;
pub use key::{CacheKey, UNCACHEABLE_FINGERPRINT, combine_ids};
pub use store::{FsRecordStore, MemoryRecordStore, RecordStore};
pub use target::{FingerprintStrategy, Target};
