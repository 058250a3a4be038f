//! Directory-of-files record store
//!
//! ## Layout
//!
//! ```text
//! {root}/
//!   src%2Fapp%3Abin.hash   (fingerprint of id "src/app:bin")
//!   util.hash
//! ```

use super::RecordStore;
use crate::{Error, Result};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Suffix of every record file
pub const RECORD_EXTENSION: &str = ".hash";

const MAX_FILENAME_LEN: usize = 255;
const SHORTENED_DIGEST_LEN: usize = 16;
const SHORTENED_SEPARATOR: char = '~';

/// Bytes kept verbatim in record filenames; everything else is percent-encoded.
const FILENAME_SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'-').remove(b'_');

/// Encode a target id as a record filename.
///
/// Ids are percent-encoded so distinct ids never share a file and path
/// separators never escape the store root. Names longer than the usual 255 byte
/// filesystem limit keep a readable prefix and suffix around a digest of the
/// full name, joined by `~`. The encoder never leaves `~` raw, so a shortened name
/// cannot be the plain encoding of some other id.
#[must_use]
pub fn record_file_name(id: &str) -> String {
    let mut encoded = utf8_percent_encode(id, FILENAME_SAFE).to_string();
    if encoded.starts_with('.') {
        encoded.replace_range(..1, "%2E");
    }

    let filename = format!("{encoded}{RECORD_EXTENSION}");
    if filename.len() <= MAX_FILENAME_LEN {
        return filename;
    }

    let digest = hex::encode(Sha256::digest(filename.as_bytes()));
    let digest = &digest[..SHORTENED_DIGEST_LEN];
    let keep = (MAX_FILENAME_LEN
        - (2 * SHORTENED_SEPARATOR.len_utf8() + RECORD_EXTENSION.len() + SHORTENED_DIGEST_LEN))
        / 2;
    // `encoded` is pure ASCII, so byte slicing stays on char boundaries.
    let prefix = &encoded[..keep];
    let suffix = &encoded[encoded.len() - keep..];
    format!("{prefix}{SHORTENED_SEPARATOR}{digest}{SHORTENED_SEPARATOR}{suffix}{RECORD_EXTENSION}")
}

fn record_name_from_file_name(file_name: &str) -> Option<String> {
    let stem = file_name.strip_suffix(RECORD_EXTENSION)?;
    Some(percent_decode_str(stem).decode_utf8_lossy().into_owned())
}

/// Record store keeping one file per id under a root directory.
#[derive(Debug, Clone)]
pub struct FsRecordStore {
    root: PathBuf,
}

impl FsRecordStore {
    /// Open a store at `root`, creating the directory (and parents) if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| Error::io(e, &root, "create_dir_all"))?;
        Ok(Self { root })
    }

    /// Directory holding the records
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the record file for `id`
    #[must_use]
    pub fn record_path(&self, id: &str) -> PathBuf {
        self.root.join(record_file_name(id))
    }

    fn read_record(path: &Path) -> Result<Option<String>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(e, path, "read")),
        };
        let content = String::from_utf8(bytes)
            .map_err(|e| Error::corrupt_record(path, format!("record is not valid UTF-8: {e}")))?;
        Ok(Some(content.trim().to_string()))
    }
}

impl RecordStore for FsRecordStore {
    fn read(&self, id: &str) -> Result<Option<String>> {
        let path = self.record_path(id);
        tracing::trace!(id, path = %path.display(), "Reading invalidation record");
        Self::read_record(&path)
    }

    fn write(&self, id: &str, fingerprint: &str) -> Result<()> {
        let path = self.record_path(id);
        // A concurrent reset may have moved the directory aside.
        fs::create_dir_all(&self.root).map_err(|e| Error::io(e, &self.root, "create_dir_all"))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)
            .map_err(|e| Error::io(e, &self.root, "create_temp"))?;
        tmp.write_all(fingerprint.as_bytes())
            .map_err(|e| Error::io(e, tmp.path(), "write"))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| Error::io(e, tmp.path(), "sync"))?;
        tmp.persist(&path)
            .map_err(|e| Error::io(e.error, &path, "persist"))?;

        tracing::debug!(id, fingerprint, path = %path.display(), "Wrote invalidation record");
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<()> {
        let path = self.record_path(id);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(id, path = %path.display(), "Removed invalidation record");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(e, &path, "remove")),
        }
    }

    fn clear(&self) -> Result<()> {
        let Some(parent) = self.root.parent() else {
            return Err(Error::configuration(format!(
                "refusing to reset record store at filesystem root {}",
                self.root.display()
            )));
        };
        let dir_name = self
            .root
            .file_name()
            .map_or_else(|| "records".into(), |n| n.to_string_lossy().into_owned());

        // Move the live directory aside in one rename, then recreate it empty, so
        // readers never observe a partially deleted store.
        let graveyard = tempfile::Builder::new()
            .prefix(&format!(".{dir_name}.reset-"))
            .tempdir_in(parent)
            .map_err(|e| Error::io(e, parent, "create_temp_dir"))?;
        let retired = graveyard.path().join(&dir_name);
        match fs::rename(&self.root, &retired) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(Error::io(e, &self.root, "rename")),
        }
        fs::create_dir_all(&self.root).map_err(|e| Error::io(e, &self.root, "create_dir_all"))?;

        let graveyard_path = graveyard.path().to_path_buf();
        if let Err(e) = graveyard.close() {
            tracing::warn!(
                path = %graveyard_path.display(),
                "Failed to delete retired invalidation records: {e}"
            );
        }
        tracing::debug!(root = %self.root.display(), "Reset invalidation record store");
        Ok(())
    }

    fn entries(&self) -> Result<Vec<(String, String)>> {
        let dir = match fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(e, &self.root, "read_dir")),
        };

        let mut entries = Vec::new();
        for entry in dir {
            let entry = entry.map_err(|e| Error::io(e, &self.root, "read_dir"))?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str().and_then(record_name_from_file_name) else {
                continue;
            };
            // Records deleted since the directory was listed are simply skipped.
            if let Some(fingerprint) = Self::read_record(&entry.path())? {
                entries.push((name, fingerprint));
            }
        }
        entries.sort();
        Ok(entries)
    }
}
