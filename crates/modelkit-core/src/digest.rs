//! Content digests.
//!
//! A digest has the form `algorithm:encoded`. Only the algorithms registered
//! by the OCI image spec are accepted, and the encoded part must be the
//! lowercase hex encoding of a hash of the right length.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::error::{Error, Result};

/// Supported algorithms and the length of their hex encoding.
const ALGORITHMS: &[(&str, usize)] = &[("sha256", 64), ("sha384", 96), ("sha512", 128)];

/// A validated content digest, e.g. `sha256:9f86d0...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest(String);

impl Digest {
    /// Parses and validates a digest string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDigest`] if the string is not `algorithm:hex`,
    /// the algorithm is unsupported, or the hex part has the wrong length.
    ///
    /// # Examples
    ///
    /// ```
    /// use modelkit_core::Digest;
    ///
    /// let hex = "a".repeat(64);
    /// assert!(Digest::parse(&format!("sha256:{hex}")).is_ok());
    /// assert!(Digest::parse("sha256:abc").is_err());
    /// assert!(Digest::parse("latest").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidDigest {
            digest: input.to_string(),
            reason: reason.to_string(),
        };

        let (algorithm, encoded) = input
            .split_once(':')
            .ok_or_else(|| invalid("missing algorithm separator ':'"))?;

        let expected_len = ALGORITHMS
            .iter()
            .find(|(name, _)| *name == algorithm)
            .map(|(_, len)| *len)
            .ok_or_else(|| invalid("unsupported algorithm"))?;

        if encoded.len() != expected_len {
            return Err(invalid(&format!(
                "expected {expected_len} hex characters, found {}",
                encoded.len()
            )));
        }
        if !encoded
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(invalid("encoded part must be lowercase hex"));
        }

        Ok(Self(input.to_string()))
    }

    /// Returns true if `input` is a valid digest.
    #[must_use]
    pub fn is_valid(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    /// Computes the sha256 digest of `data`.
    #[must_use]
    pub fn sha256_of(data: &[u8]) -> Self {
        Self(format!("sha256:{}", hex::encode(Sha256::digest(data))))
    }

    /// Returns the digest algorithm (e.g. `sha256`).
    #[must_use]
    pub fn algorithm(&self) -> &str {
        self.0.split_once(':').map_or("", |(alg, _)| alg)
    }

    /// Returns the hex-encoded hash without the algorithm prefix.
    #[must_use]
    pub fn encoded(&self) -> &str {
        self.0.split_once(':').map_or("", |(_, enc)| enc)
    }

    /// Returns the full digest string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Digest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Digest {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}
