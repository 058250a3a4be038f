//! Durable storage for invalidation records
//!
//! A record maps a target id to the fingerprint that was valid as of the last
//! successful build. Stores must replace a record atomically: concurrent readers
//! see either the old or the new fingerprint, never a partial write.

mod fs;
mod memory;

pub use fs::{FsRecordStore, RECORD_EXTENSION, record_file_name};
pub use memory::MemoryRecordStore;

use crate::Result;

/// Key-value storage of one fingerprint per target id.
pub trait RecordStore {
    /// Read the recorded fingerprint for `id`, or `None` if there is no record.
    fn read(&self, id: &str) -> Result<Option<String>>;

    /// Record `fingerprint` for `id`, replacing any previous value.
    fn write(&self, id: &str, fingerprint: &str) -> Result<()>;

    /// Delete the record for `id`. A missing record is not an error.
    fn remove(&self, id: &str) -> Result<()>;

    /// Delete every record in the store.
    fn clear(&self) -> Result<()>;

    /// All records as `(name, fingerprint)` pairs sorted by name.
    ///
    /// The name is the record's id, except where a store had to shorten an id
    /// to persist it.
    fn entries(&self) -> Result<Vec<(String, String)>>;
}
