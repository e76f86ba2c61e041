//! Store capabilities consumed by the resolver and unpacker.
//!
//! The transport that talks to registries and the subsystem that owns local
//! storage live outside this crate; they are reached only through these
//! traits so that tests can drive everything from memory.

use std::io::{self, Read};

use modelkit_core::{Descriptor, Index};
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;

/// A content-addressable store.
///
/// Implementations must be safe to share across threads; the resolver and
/// unpacker hold no state of their own between calls.
pub trait ContentStore: Send + Sync {
    /// Opens a byte stream over the blob described by `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the blob is absent, or another
    /// [`StoreError`] if it cannot be opened.
    fn fetch(&self, descriptor: &Descriptor) -> Result<Box<dyn Read + Send + '_>, StoreError>;

    /// Resolves a tag or digest to a manifest descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if nothing is known by that name.
    fn resolve(&self, reference: &str) -> Result<Descriptor, StoreError>;
}

/// A provider of the local index that binds tags to manifest digests.
pub trait IndexProvider: Send + Sync {
    /// Loads the current index.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the index cannot be read or parsed.
    fn index(&self) -> Result<Index, StoreError>;
}

/// A reader that fails once its cancellation token fires.
///
/// Every `read` checks the token first, so a long copy stops within one
/// buffer of the cancellation. The returned error is not
/// [`io::ErrorKind::Interrupted`], which `std::io` helpers would retry.
#[derive(Debug)]
pub struct CancellableReader<R> {
    inner: R,
    cancel: CancellationToken,
}

impl<R: Read> CancellableReader<R> {
    /// Wraps `inner`, observing `cancel`.
    #[must_use]
    pub fn new(inner: R, cancel: &CancellationToken) -> Self {
        Self {
            inner,
            cancel: cancel.clone(),
        }
    }
}

impl<R: Read> Read for CancellableReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cancel.is_cancelled() {
            return Err(io::Error::other("operation cancelled"));
        }
        self.inner.read(buf)
    }
}
