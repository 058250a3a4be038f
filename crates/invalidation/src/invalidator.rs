//! Persistent map from target sets to the cache key of their last successful build
//!
//! The recorded key can be compared with a freshly generated one to decide
//! whether a target set must be rebuilt, and its fingerprint can be used to look
//! up build artifacts in an artifact cache.
//!
//! ## Directory Structure
//!
//! ```text
//! {root}/
//!   {schema_version}/
//!     {scope}/            (omitted for a global invalidator)
//!       {encoded id}.hash
//! ```
//!
//! Bumping the schema version makes every older record unreachable without
//! deleting anything.

use crate::key::CacheKey;
use crate::store::{FsRecordStore, RECORD_EXTENSION, RecordStore};
use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Invalidates build targets by comparing cache keys against recorded fingerprints.
#[derive(Debug)]
pub struct BuildInvalidator<S = FsRecordStore> {
    store: S,
}

impl BuildInvalidator<FsRecordStore> {
    /// Create an invalidator storing records under `root`.
    ///
    /// Records are namespaced by `schema_version` and, if given, by `scope` (e.g. a
    /// task name); without a scope the invalidator is global. The directory is
    /// created if it does not exist.
    pub fn new(root: impl AsRef<Path>, schema_version: &str, scope: Option<&str>) -> Result<Self> {
        let root = scoped_root(root.as_ref(), schema_version, scope)?;
        Ok(Self::with_store(FsRecordStore::open(root)?))
    }

    /// Directory holding this invalidator's records
    #[must_use]
    pub fn root(&self) -> &Path {
        self.store.root()
    }
}

impl<S: RecordStore> BuildInvalidator<S> {
    /// Create an invalidator over an arbitrary record store
    pub fn with_store(store: S) -> Self {
        Self { store }
    }

    /// The underlying record store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The key of the previous successful build of `key`'s target set, if any.
    ///
    /// The returned key has `key`'s id and the recorded fingerprint. Uncacheable
    /// keys never have a previous key, and neither do records holding an empty
    /// fingerprint.
    pub fn previous_key(&self, key: &CacheKey) -> Result<Option<CacheKey>> {
        if !key.is_cacheable() {
            return Ok(None);
        }
        Ok(self
            .store
            .read(key.id())?
            .filter(|fingerprint| !fingerprint.is_empty())
            .map(|fingerprint| CacheKey::new(key.id(), fingerprint)))
    }

    /// Whether the target set versioned by `key` is out of date.
    ///
    /// Uncacheable keys are always out of date, as are keys without a record.
    pub fn needs_update(&self, key: &CacheKey) -> Result<bool> {
        if !key.is_cacheable() {
            return Ok(true);
        }
        let recorded = self.store.read(key.id())?;
        let stale = recorded.as_deref() != Some(key.fingerprint());
        tracing::trace!(
            id = key.id(),
            fingerprint = key.fingerprint(),
            recorded = recorded.as_deref().unwrap_or("<none>"),
            stale,
            "Checked invalidation record"
        );
        Ok(stale)
    }

    /// Make `key` the valid version of its target set. No-op for uncacheable keys.
    ///
    /// Records are whitespace-trimmed when read back, so a fingerprint with
    /// leading or trailing whitespace still needs an update afterwards.
    pub fn update(&self, key: &CacheKey) -> Result<()> {
        if key.is_cacheable() {
            self.store.write(key.id(), key.fingerprint())?;
        }
        Ok(())
    }

    /// Forget the recorded version of `key`'s target set. No-op for uncacheable
    /// keys and for target sets without a record.
    pub fn force_invalidate(&self, key: &CacheKey) -> Result<()> {
        if key.is_cacheable() {
            self.store.remove(key.id())?;
        }
        Ok(())
    }

    /// Forget every recorded version in this invalidator's scope.
    pub fn force_invalidate_all(&self) -> Result<()> {
        self.store.clear()
    }

    /// The fingerprint recorded for `id`, if any
    pub fn recorded_fingerprint(&self, id: &str) -> Result<Option<String>> {
        self.store.read(id)
    }

    /// Every record in scope as `(name, fingerprint)` pairs
    pub fn entries(&self) -> Result<Vec<(String, String)>> {
        self.store.entries()
    }
}

fn scoped_root(root: &Path, schema_version: &str, scope: Option<&str>) -> Result<PathBuf> {
    validate_component("schema version", schema_version)?;
    let mut path = root.join(schema_version);
    if let Some(scope) = scope.filter(|s| !s.is_empty()) {
        validate_component("scope", scope)?;
        // Scope directories live next to the global records.
        if scope.ends_with(RECORD_EXTENSION) {
            return Err(Error::configuration(format!(
                "scope '{scope}' must not end in '{RECORD_EXTENSION}'"
            )));
        }
        path.push(scope);
    }
    Ok(path)
}

/// Check that `value` is usable as a single path component.
pub(crate) fn validate_component(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::configuration(format!("{what} must not be empty")));
    }
    if value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(Error::configuration(format!(
            "{what} '{value}' must be a single path component"
        )));
    }
    Ok(())
}
