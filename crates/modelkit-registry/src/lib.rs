//! # ModelKit Registry
//!
//! Reference parsing and content resolution for ModelKits.
//!
//! This crate turns human-supplied references into canonical
//! registry/repository/tag triples and resolves them, through an injected
//! content-addressable store, into validated manifests and Kitfiles.
//!
//! ## Features
//!
//! - **Reference parsing**: `[registry[:port]/]repository[:tag|@digest][,tag2,...]`
//!   with default registry inference
//! - **Content resolution**: manifest and Kitfile fetching with media type checks
//! - **Tag lookup**: digest to tag mapping over a local index
//! - **Stores**: an in-memory store for tests and a read-only local OCI layout store
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use modelkit_registry::{parse_reference, resolve_manifest_and_config, StorageConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let (reference, _extra_tags) = parse_reference("myorg/sentiment:v1")?;
//! let store = StorageConfig::default().open(&reference);
//!
//! let (manifest, kitfile) =
//!     resolve_manifest_and_config(&store, &reference.reference, &CancellationToken::new())?;
//! println!("{} layers, model at {:?}", manifest.layers.len(), kitfile.model);
//! # Ok::<(), modelkit_registry::RegistryError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────────┐    ┌────────────────────┐
//! │  reference   │───▶│     resolve      │───▶│ Manifest + Kitfile │
//! │   (parse)    │    │ (media type      │    └────────────────────┘
//! └──────────────┘    │  validation)     │
//!                     └────────┬─────────┘
//!                              │ ContentStore / IndexProvider
//!                     ┌────────┴─────────┐
//!                     │ MemoryStore      │
//!                     │ LocalLayoutStore │
//!                     └──────────────────┘
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod config;
mod error;
mod layout;
mod memory;
mod reference;
mod resolve;
mod store;
mod tags;

pub use config::{StorageConfig, STORAGE_ENV};
pub use error::{RegistryError, StoreError};
pub use layout::LocalLayoutStore;
pub use memory::MemoryStore;
pub use reference::{
    format_repository_for_display, looks_like_registry_host, parse_reference, validate_tag,
    Reference, DEFAULT_REGISTRY, DEFAULT_REPOSITORY, DEFAULT_TAG,
};
pub use resolve::{
    get_config, get_manifest, get_manifest_and_config, resolve_manifest,
    resolve_manifest_and_config,
};
pub use store::{CancellableReader, ContentStore, IndexProvider};
pub use tags::get_tags_for_descriptor;
