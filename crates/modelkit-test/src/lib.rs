//! # ModelKit Test
//!
//! Fixtures for exercising ModelKit resolution and unpacking.
//!
//! This crate provides:
//!
//! - [`LayerBuilder`] for gzip-compressed tar layers, including malformed
//!   entries (escaping paths, symlinks, truncated files)
//! - [`ModelKitFixture`] for storing a complete ModelKit in a
//!   [`MemoryStore`](modelkit_registry::MemoryStore) or on-disk OCI layout
//!
//! ## Example
//!
//! ```rust
//! use modelkit_registry::{resolve_manifest_and_config, MemoryStore};
//! use modelkit_test::ModelKitFixture;
//! use tokio_util::sync::CancellationToken;
//!
//! let mut store = MemoryStore::new();
//! let stored = ModelKitFixture::simple().insert_into(&mut store, "v1")?;
//!
//! let (manifest, _) =
//!     resolve_manifest_and_config(&store, "v1", &CancellationToken::new()).unwrap();
//! assert_eq!(manifest, stored.manifest);
//! # Ok::<(), modelkit_test::FixtureError>(())
//! ```

pub mod error;
pub mod fixtures;
pub mod layer;

pub use error::{FixtureError, Result};
pub use fixtures::{ModelKitFixture, StoredModelKit};
pub use layer::LayerBuilder;
