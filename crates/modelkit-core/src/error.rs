//! Error types for ModelKit core operations.

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in ModelKit core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A string is not a well-formed, supported content digest.
    #[error("Invalid digest '{digest}': {reason}")]
    InvalidDigest {
        /// The offending digest string.
        digest: String,
        /// Why the digest was rejected.
        reason: String,
    },

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_digest() {
        let err = Error::InvalidDigest {
            digest: "md5:abc".to_string(),
            reason: "unsupported algorithm".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid digest 'md5:abc': unsupported algorithm"
        );
    }
}
