//! # ModelKit Core
//!
//! Core document types for ModelKit artifacts.
//!
//! A ModelKit is an OCI artifact whose config blob is a [`Kitfile`] and whose
//! layers are gzip-compressed tarballs holding the model, code and datasets
//! the Kitfile describes. This crate provides:
//!
//! - [`Descriptor`], [`Manifest`] and [`Index`] - OCI documents
//! - [`MediaType`] - the media types that identify ModelKit blobs
//! - [`Digest`] - validated content digests
//! - [`Kitfile`] - the ModelKit config document
//!
//! ## Example
//!
//! ```rust
//! use modelkit_core::{Descriptor, Digest, MediaType};
//!
//! let config = br#"{"manifestVersion":"1.0"}"#;
//! let digest = Digest::sha256_of(config);
//! let desc = Descriptor::new(MediaType::MODEL_CONFIG, digest.as_str(), config.len() as u64);
//! assert!(desc.is_media_type(MediaType::MODEL_CONFIG));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod digest;
pub mod error;
pub mod kitfile;
pub mod oci;


pub use digest::Digest;
pub use error::{Error, Result};
pub use kitfile::{Code, DataSet, Kitfile, Model, Package, KITFILE_NAME};
pub use oci::{
    Descriptor, Index, Manifest, MediaType, ANNOTATION_ENTRY_PATH, ANNOTATION_REF_NAME,
};
