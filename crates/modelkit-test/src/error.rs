//! Error types for fixture construction.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for fixture operations.
pub type Result<T> = std::result::Result<T, FixtureError>;

/// Errors that can occur while building fixtures.
#[derive(Error, Debug)]
pub enum FixtureError {
    /// Failed to assemble a layer archive.
    #[error("Failed to build layer: {0}")]
    Layer(#[source] std::io::Error),

    /// I/O error with path context.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path involved in the operation.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize a document.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to encode a digest or the Kitfile.
    #[error(transparent)]
    Core(#[from] modelkit_core::Error),
}
