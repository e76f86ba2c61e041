//! Read-only access to a local OCI image layout.
//!
//! A layout directory holds an `index.json` listing manifests (tags are
//! ref-name annotations on its entries) and a `blobs/<algorithm>/<hex>` tree
//! of content. Writes to the layout belong to the storage subsystem.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use modelkit_core::{Descriptor, Digest, Index, MediaType};
use sha2::digest::DynDigest;
use sha2::{Sha256, Sha384, Sha512};

use crate::error::StoreError;
use crate::store::{ContentStore, IndexProvider};

/// Name of the index document at the layout root.
const INDEX_FILE: &str = "index.json";

/// A [`ContentStore`] and [`IndexProvider`] over an OCI layout directory.
#[derive(Debug, Clone)]
pub struct LocalLayoutStore {
    root: PathBuf,
}

impl LocalLayoutStore {
    /// Opens the layout rooted at `root`. Nothing is read until first use.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the layout root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the on-disk path of a blob.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidLayout`] if `digest` is not a valid
    /// digest; digests are validated before they are turned into paths.
    pub fn blob_path(&self, digest: &str) -> Result<PathBuf, StoreError> {
        let digest = Digest::parse(digest).map_err(|e| StoreError::InvalidLayout {
            path: self.root.join("blobs"),
            message: e.to_string(),
        })?;
        Ok(self
            .root
            .join("blobs")
            .join(digest.algorithm())
            .join(digest.encoded()))
    }

    /// Describes a manifest blob that has no index entry.
    fn untagged_manifest(&self, digest: &str) -> Result<Descriptor, StoreError> {
        let path = self.blob_path(digest)?;
        let metadata = std::fs::metadata(&path).map_err(|_| StoreError::NotFound {
            reference: digest.to_string(),
        })?;
        Ok(Descriptor::new(MediaType::OCI_MANIFEST, digest, metadata.len()))
    }
}

impl IndexProvider for LocalLayoutStore {
    fn index(&self) -> Result<Index, StoreError> {
        let path = self.root.join(INDEX_FILE);
        let data = std::fs::read(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StoreError::NotFound {
                    reference: path.display().to_string(),
                }
            } else {
                StoreError::Io {
                    path: path.clone(),
                    source: e,
                }
            }
        })?;
        serde_json::from_slice(&data).map_err(|e| StoreError::InvalidLayout {
            path,
            message: e.to_string(),
        })
    }
}

impl ContentStore for LocalLayoutStore {
    fn fetch(&self, descriptor: &Descriptor) -> Result<Box<dyn Read + Send + '_>, StoreError> {
        let path = self.blob_path(&descriptor.digest)?;
        let file = File::open(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StoreError::NotFound {
                    reference: descriptor.digest.clone(),
                }
            } else {
                StoreError::Io {
                    path: path.clone(),
                    source: e,
                }
            }
        })?;
        tracing::trace!(digest = %descriptor.digest, path = %path.display(), "Opened blob");
        Ok(Box::new(VerifyingReader::new(
            BufReader::new(file),
            descriptor,
        )?))
    }

    fn resolve(&self, reference: &str) -> Result<Descriptor, StoreError> {
        let index = self.index()?;

        let found = if Digest::is_valid(reference) {
            match index.find_digest(reference) {
                Some(entry) => entry.clone(),
                None => self.untagged_manifest(reference)?,
            }
        } else {
            index
                .find_tag(reference)
                .cloned()
                .ok_or_else(|| StoreError::NotFound {
                    reference: reference.to_string(),
                })?
        };

        Ok(Descriptor {
            annotations: None,
            ..found
        })
    }
}

/// Verifies size and digest of a blob as it is streamed.
///
/// Oversized content fails as soon as it is read; the digest is checked when
/// the underlying reader reaches end of file.
struct VerifyingReader<R> {
    inner: R,
    hasher: Box<dyn DynDigest + Send>,
    digest: Digest,
    expected_size: u64,
    read: u64,
    verified: bool,
}

impl<R: Read> VerifyingReader<R> {
    fn new(inner: R, descriptor: &Descriptor) -> Result<Self, StoreError> {
        let digest = Digest::parse(&descriptor.digest).map_err(|e| StoreError::InvalidLayout {
            path: PathBuf::from(&descriptor.digest),
            message: e.to_string(),
        })?;
        let hasher: Box<dyn DynDigest + Send> = match digest.algorithm() {
            "sha384" => Box::new(Sha384::default()),
            "sha512" => Box::new(Sha512::default()),
            _ => Box::new(Sha256::default()),
        };
        Ok(Self {
            inner,
            hasher,
            digest,
            expected_size: descriptor.size,
            read: 0,
            verified: false,
        })
    }

    fn size_mismatch(&self) -> io::Error {
        io::Error::new(
            io::ErrorKind::InvalidData,
            StoreError::SizeMismatch {
                digest: self.digest.to_string(),
                expected: self.expected_size,
                actual: self.read,
            },
        )
    }
}

impl<R: Read> Read for VerifyingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.hasher.update(&buf[..n]);
            self.read += n as u64;
            if self.read > self.expected_size {
                return Err(self.size_mismatch());
            }
        } else if !buf.is_empty() && !self.verified {
            if self.read != self.expected_size {
                return Err(self.size_mismatch());
            }
            let actual = format!(
                "{}:{}",
                self.digest.algorithm(),
                hex::encode(self.hasher.finalize_reset())
            );
            if actual != self.digest.as_str() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    StoreError::DigestMismatch {
                        expected: self.digest.to_string(),
                        actual,
                    },
                ));
            }
            self.verified = true;
        }
        Ok(n)
    }
}
