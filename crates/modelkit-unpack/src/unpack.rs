//! Unpack orchestration.

use modelkit_core::{Kitfile, Manifest};
use modelkit_registry::{resolve_manifest_and_config, ContentStore};
use tokio_util::sync::CancellationToken;

use crate::error::UnpackError;
use crate::extract::{extract_layer, write_config};
use crate::options::UnpackOptions;
use crate::plan::{plan, LayerKind};

/// What an unpack wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnpackSummary {
    /// Whether the Kitfile was written.
    pub config: bool,
    /// Model layers extracted.
    pub model: usize,
    /// Code layers extracted.
    pub code: usize,
    /// Dataset layers extracted.
    pub datasets: usize,
}

/// Unpacks a resolved ModelKit under `options.root`.
///
/// Layers are processed one at a time in manifest order. All containment
/// and pre-existence checks for destinations run before anything is
/// written; archive entries are checked again as they are extracted. The
/// unpack is not atomic: a failure leaves earlier layers on disk.
///
/// # Errors
///
/// - [`UnpackError::PathEscape`] if a destination or entry leaves the root
/// - [`UnpackError::PathExists`] if a path exists and overwriting is off
/// - [`UnpackError::PathTypeConflict`] if an existing path is the wrong kind
/// - [`UnpackError::MissingConfigEntry`] if a layer has no Kitfile entry
/// - [`UnpackError::UnsupportedEntry`] for links and special files
/// - [`UnpackError::ShortWrite`] for truncated entries
/// - [`UnpackError::Cancelled`] if `cancel` fires
pub fn unpack_modelkit<S>(
    store: &S,
    manifest: &Manifest,
    config: &Kitfile,
    options: &UnpackOptions,
    cancel: &CancellationToken,
) -> Result<UnpackSummary, UnpackError>
where
    S: ContentStore + ?Sized,
{
    if cancel.is_cancelled() {
        return Err(UnpackError::Cancelled);
    }
    let plan = plan(manifest, config, options)?;
    let mut summary = UnpackSummary::default();

    if let Some(path) = &plan.config_path {
        write_config(config, path, options.overwrite)?;
        summary.config = true;
    }

    for layer in &plan.layers {
        tracing::info!(
            kind = %layer.kind,
            name = layer.name.as_deref().unwrap_or_default(),
            path = %layer.relative.display(),
            entry = ?layer.entry_index,
            digest = %layer.descriptor.digest,
            "Unpacking layer"
        );
        extract_layer(store, layer, &options.root, options.overwrite, cancel)?;

        match layer.kind {
            LayerKind::Model => summary.model += 1,
            LayerKind::Code => summary.code += 1,
            LayerKind::Dataset => summary.datasets += 1,
        }
    }

    tracing::info!(
        root = %options.root.display(),
        config = summary.config,
        model = summary.model,
        code = summary.code,
        datasets = summary.datasets,
        "Unpacked ModelKit"
    );
    Ok(summary)
}

/// Resolves a tag or digest in `store` and unpacks it.
///
/// # Errors
///
/// Returns [`UnpackError::Registry`] if resolution fails, otherwise any
/// error from [`unpack_modelkit`].
pub fn unpack_reference<S>(
    store: &S,
    reference: &str,
    options: &UnpackOptions,
    cancel: &CancellationToken,
) -> Result<UnpackSummary, UnpackError>
where
    S: ContentStore + ?Sized,
{
    let (manifest, config) = resolve_manifest_and_config(store, reference, cancel)?;
    unpack_modelkit(store, &manifest, &config, options, cancel)
}
