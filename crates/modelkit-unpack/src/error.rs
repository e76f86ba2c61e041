//! Error types for unpacking.

use std::path::PathBuf;

use modelkit_registry::{RegistryError, StoreError};
use thiserror::Error;

use crate::filesystem::PathKind;

/// Errors that can occur while unpacking a ModelKit.
///
/// Every variant carries the offending path, digest, or entry so callers can
/// render a diagnostic without further lookups.
#[derive(Error, Debug)]
pub enum UnpackError {
    /// Resolving the reference failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A destination or archive entry would land outside the unpack root.
    #[error("Path {path} resolves outside of {root}")]
    PathEscape {
        /// The offending path as declared.
        path: PathBuf,
        /// The unpack root.
        root: PathBuf,
    },

    /// A path exists and overwriting was not requested.
    #[error("Path {path} already exists")]
    PathExists {
        /// The existing path.
        path: PathBuf,
    },

    /// A path exists but is not the kind about to be written.
    #[error("Path {path} already exists and is not a {expected}")]
    PathTypeConflict {
        /// The existing path.
        path: PathBuf,
        /// What the unpack would have written.
        expected: PathKind,
    },

    /// An archive entry is neither a directory nor a regular file.
    #[error("Unsupported {kind} entry in archive: {path}")]
    UnsupportedEntry {
        /// Path of the entry as stored in the archive.
        path: PathBuf,
        /// The entry's type.
        kind: String,
    },

    /// Fewer or more bytes were written than the entry declared.
    #[error("Could not extract {path}: expected {expected} bytes, wrote {written}")]
    ShortWrite {
        /// The file being written.
        path: PathBuf,
        /// Size declared by the archive header.
        expected: u64,
        /// Bytes actually written.
        written: u64,
    },

    /// A code or dataset layer has no Kitfile entry.
    #[error("No {kind} entry in Kitfile for layer ({selector})")]
    MissingConfigEntry {
        /// Layer kind.
        kind: &'static str,
        /// How the entry was looked up.
        selector: String,
    },

    /// A layer could not be fetched from the store.
    #[error("Failed to fetch layer {digest}: {source}")]
    Fetch {
        /// Layer digest.
        digest: String,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },

    /// A layer's compressed archive could not be read.
    #[error("Failed to read layer {digest}: {source}")]
    Archive {
        /// Layer digest.
        digest: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// I/O error with path context.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path involved in the operation.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The Kitfile could not be serialized.
    #[error("Failed to serialize Kitfile: {0}")]
    ConfigSerialize(#[source] modelkit_core::Error),

    /// An unknown `--filter` value.
    #[error("Invalid unpack filter '{filter}': expected config, model, code or datasets")]
    InvalidFilter {
        /// The rejected value.
        filter: String,
    },

    /// The operation was cancelled.
    #[error("Unpack cancelled")]
    Cancelled,
}

impl UnpackError {
    /// Returns true if the unpack was cancelled, directly or while resolving.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::Registry(RegistryError::Cancelled)
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = UnpackError::PathTypeConflict {
            path: PathBuf::from("/out/src"),
            expected: PathKind::Directory,
        };
        assert_eq!(
            err.to_string(),
            "Path /out/src already exists and is not a directory"
        );

        let err = UnpackError::ShortWrite {
            path: PathBuf::from("model.bin"),
            expected: 100,
            written: 10,
        };
        assert!(err.to_string().contains("expected 100 bytes, wrote 10"));
    }

    #[test]
    fn test_is_cancelled() {
        assert!(UnpackError::Cancelled.is_cancelled());
        assert!(UnpackError::Registry(RegistryError::Cancelled).is_cancelled());
        assert!(!UnpackError::PathExists {
            path: PathBuf::from("x")
        }
        .is_cancelled());
    }
}
