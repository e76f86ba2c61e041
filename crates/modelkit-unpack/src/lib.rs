//! # ModelKit Unpack
//!
//! Materializes a resolved ModelKit's artifacts onto the filesystem.
//!
//! Every artifact lands at the path its Kitfile entry declares, verified to
//! stay under the unpack root. Code and dataset layers are bound to Kitfile
//! entries by the `ml.kitops.modelkit.entry-path` layer annotation, falling
//! back to their position among layers of the same kind.
//!
//! ## Example
//!
//! ```rust,no_run
//! use modelkit_registry::{parse_reference, StorageConfig};
//! use modelkit_unpack::{unpack_reference, UnpackFilter, UnpackOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! let (reference, _) = parse_reference("myorg/sentiment:v1")?;
//! let store = StorageConfig::default().open(&reference);
//! let options = UnpackOptions::new("./sentiment").with_filter(UnpackFilter::parse("model,code")?);
//!
//! let summary = unpack_reference(&store, &reference.reference, &options, &CancellationToken::new())?;
//! println!("unpacked {} code layers", summary.code);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
mod extract;
mod filesystem;
mod options;
mod plan;
mod unpack;

pub use error::UnpackError;
pub use filesystem::{verify_subpath, PathKind};
pub use options::{UnpackFilter, UnpackOptions};
pub use plan::LayerKind;
pub use unpack::{unpack_modelkit, unpack_reference, UnpackSummary};
