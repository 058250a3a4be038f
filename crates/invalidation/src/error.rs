//! Error types for the invalidation crate

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Error type for invalidation operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// I/O error while reading or writing invalidation records
    #[error("I/O {operation} failed: {}", path.display())]
    #[diagnostic(
        code(stale::invalidation::io),
        help("Check file permissions and available disk space under the invalidator root")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error
        path: Box<Path>,
        /// Operation that failed (e.g., "read", "persist", "remove")
        operation: String,
    },

    /// A record exists but does not hold a readable fingerprint
    #[error("Corrupt invalidation record {}: {reason}", path.display())]
    #[diagnostic(
        code(stale::invalidation::corrupt_record),
        help("Remove the record with `stale invalidate <id>` to force a rebuild")
    )]
    CorruptRecord {
        /// Path of the offending record
        path: Box<Path>,
        /// Why the record could not be used
        reason: String,
    },

    /// Configuration or validation error
    #[error("Invalidation configuration error: {message}")]
    #[diagnostic(code(stale::invalidation::config))]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(code(stale::invalidation::serialization))]
    Serialization {
        /// Error message describing the serialization issue
        message: String,
    },
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: path.as_ref().into(),
            operation: operation.into(),
        }
    }

    /// Create a corrupt record error
    #[must_use]
    pub fn corrupt_record(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::CorruptRecord {
            path: path.as_ref().into(),
            reason: reason.into(),
        }
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }
}

/// Result type for invalidation operations
pub type Result<T> = std::result::Result<T, Error>;
