//! Error types for reference parsing, stores and content resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a [`ContentStore`](crate::ContentStore) or
/// [`IndexProvider`](crate::IndexProvider).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The reference or blob is not present in the store.
    #[error("Not found in store: {reference}")]
    NotFound {
        /// Tag, digest or path that was looked up.
        reference: String,
    },

    /// File I/O error.
    #[error("File I/O error at {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Reading a fetched blob failed part way through.
    #[error("Failed to read blob {digest}: {source}")]
    Read {
        /// Digest of the blob being read.
        digest: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Blob content does not hash to its descriptor's digest.
    #[error("Digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch {
        /// Digest recorded in the descriptor.
        expected: String,
        /// Digest of the bytes actually read.
        actual: String,
    },

    /// Blob length differs from its descriptor's size.
    #[error("Size mismatch for {digest}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Digest of the blob.
        digest: String,
        /// Size recorded in the descriptor.
        expected: u64,
        /// Bytes actually read.
        actual: u64,
    },

    /// The store's on-disk layout is malformed.
    #[error("Invalid layout at {path}: {message}")]
    InvalidLayout {
        /// Path of the offending file.
        path: PathBuf,
        /// Error message.
        message: String,
    },
}

/// Errors that can occur while parsing references or resolving content.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The reference string does not follow the reference grammar.
    #[error("Invalid reference '{reference}': {reason}")]
    InvalidReference {
        /// Reference string.
        reference: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The tag does not follow the tag grammar.
    #[error("Invalid tag '{tag}': tags must match [A-Za-z0-9_][A-Za-z0-9._-]{{0,127}}")]
    InvalidTag {
        /// Tag string.
        tag: String,
    },

    /// The reference or blob could not be resolved or fetched.
    #[error("Reference {reference} not found: {source}")]
    NotFound {
        /// Tag, digest or name that was requested.
        reference: String,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },

    /// The content exists but is not a ModelKit.
    #[error("{digest} is not a ModelKit: config media type is {media_type}")]
    WrongArtifactType {
        /// Digest of the manifest or config.
        digest: String,
        /// Media type that was found.
        media_type: String,
    },

    /// The manifest blob is not a valid manifest document.
    #[error("Failed to parse manifest {digest}: {source}")]
    ManifestParse {
        /// Manifest digest.
        digest: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The config blob is not a valid Kitfile.
    #[error("Failed to parse config {digest}: {source}")]
    ConfigParse {
        /// Config digest.
        digest: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// A store operation other than a lookup failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,
}

impl RegistryError {
    /// Returns true if this error reports a cancelled operation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = RegistryError::NotFound {
            reference: "v1".to_string(),
            source: StoreError::NotFound {
                reference: "v1".to_string(),
            },
        };
        assert_eq!(err.to_string(), "Reference v1 not found: Not found in store: v1");
    }

    #[test]
    fn test_error_display_wrong_artifact_type() {
        let err = RegistryError::WrongArtifactType {
            digest: "sha256:abc".to_string(),
            media_type: "application/vnd.oci.image.config.v1+json".to_string(),
        };
        assert!(err.to_string().contains("is not a ModelKit"));
    }

    #[test]
    fn test_error_display_invalid_tag() {
        let err = RegistryError::InvalidTag {
            tag: "-bad".to_string(),
        };
        assert!(err.to_string().starts_with("Invalid tag '-bad'"));
        assert!(err.to_string().contains("{0,127}"));
    }

    #[test]
    fn test_is_cancelled() {
        assert!(RegistryError::Cancelled.is_cancelled());
        assert!(!RegistryError::InvalidTag { tag: String::new() }.is_cancelled());
    }
}
