//! Unpack planning.
//!
//! Planning classifies every layer, binds code and dataset layers to their
//! Kitfile entries, and runs every containment and pre-existence check
//! before a single byte is written.

use std::fmt;
use std::path::{Path, PathBuf};

use modelkit_core::{Descriptor, Kitfile, Manifest, MediaType, ANNOTATION_ENTRY_PATH, KITFILE_NAME};

use crate::error::UnpackError;
use crate::filesystem::{check_ancestors, check_existing, verify_subpath, PathKind};
use crate::options::UnpackOptions;

/// Kind of artifact a layer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// The trained model.
    Model,
    /// Source code.
    Code,
    /// A dataset.
    Dataset,
}

impl LayerKind {
    /// Classifies a layer by media type. Unknown types yield `None`.
    #[must_use]
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match media_type {
            MediaType::MODEL_LAYER => Some(Self::Model),
            MediaType::CODE_LAYER => Some(Self::Code),
            MediaType::DATASET_LAYER => Some(Self::Dataset),
            _ => None,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Code => "code",
            Self::Dataset => "dataset",
        }
    }

    const fn included(self, options: &UnpackOptions) -> bool {
        match self {
            Self::Model => options.include_model,
            Self::Code => options.include_code,
            Self::Dataset => options.include_datasets,
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A layer bound to its destination.
#[derive(Debug, Clone)]
pub(crate) struct PlannedLayer {
    pub kind: LayerKind,
    pub descriptor: Descriptor,
    /// Index into `config.code` or `config.datasets`.
    pub entry_index: Option<usize>,
    /// Display name from the Kitfile entry, if any.
    pub name: Option<String>,
    /// Absolute destination.
    pub destination: PathBuf,
    /// Destination relative to the root.
    pub relative: PathBuf,
}

impl PlannedLayer {
    /// Directory the layer's entries are extracted into, relative to the
    /// root.
    pub fn base(&self) -> &Path {
        self.relative.parent().unwrap_or_else(|| Path::new(""))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct UnpackPlan {
    pub config_path: Option<PathBuf>,
    pub layers: Vec<PlannedLayer>,
}

/// Builds the plan for unpacking `manifest` with `options`.
pub(crate) fn plan(
    manifest: &Manifest,
    config: &Kitfile,
    options: &UnpackOptions,
) -> Result<UnpackPlan, UnpackError> {
    let root = options.root.as_path();

    let config_path = if options.include_config {
        let path = root.join(KITFILE_NAME);
        check_existing(&path, PathKind::File, options.overwrite)?;
        Some(path)
    } else {
        None
    };

    let mut layers = Vec::new();
    let (mut code_seen, mut datasets_seen) = (0, 0);

    for descriptor in &manifest.layers {
        let Some(kind) = LayerKind::from_media_type(descriptor.media_type.as_str()) else {
            tracing::warn!(
                digest = %descriptor.digest,
                media_type = %descriptor.media_type,
                "Skipping layer with unrecognized media type"
            );
            continue;
        };

        let position = match kind {
            LayerKind::Model => 0,
            LayerKind::Code => {
                code_seen += 1;
                code_seen - 1
            }
            LayerKind::Dataset => {
                datasets_seen += 1;
                datasets_seen - 1
            }
        };
        if !kind.included(options) {
            continue;
        }

        let (entry_index, name, path) = select_entry(config, kind, descriptor, position)?;
        let (destination, relative) = verify_subpath(root, &path)?;
        check_ancestors(root, &destination)?;
        check_existing(&destination, PathKind::Any, options.overwrite)?;

        layers.push(PlannedLayer {
            kind,
            descriptor: descriptor.clone(),
            entry_index,
            name,
            destination,
            relative,
        });
    }

    Ok(UnpackPlan {
        config_path,
        layers,
    })
}

/// Finds the Kitfile entry a layer unpacks to.
///
/// The entry-path annotation wins; otherwise the layer's position among
/// layers of its kind selects the entry.
fn select_entry(
    config: &Kitfile,
    kind: LayerKind,
    descriptor: &Descriptor,
    position: usize,
) -> Result<(Option<usize>, Option<String>, String), UnpackError> {
    let annotated = descriptor.annotation(ANNOTATION_ENTRY_PATH);
    let missing = || UnpackError::MissingConfigEntry {
        kind: kind.as_str(),
        selector: annotated.map_or_else(
            || format!("position {position}"),
            |path| format!("path '{path}'"),
        ),
    };

    match kind {
        LayerKind::Model => {
            let model = config.model.as_ref().ok_or_else(missing)?;
            Ok((None, model.name.clone(), model.path.clone()))
        }
        LayerKind::Code => {
            let (index, code) = match annotated {
                Some(wanted) => config.code_by_path(wanted),
                None => config.code.get(position).map(|c| (position, c)),
            }
            .ok_or_else(missing)?;
            Ok((Some(index), code.name.clone(), code.path.clone()))
        }
        LayerKind::Dataset => {
            let (index, dataset) = match annotated {
                Some(wanted) => config.dataset_by_path(wanted),
                None => config.datasets.get(position).map(|d| (position, d)),
            }
            .ok_or_else(missing)?;
            Ok((Some(index), dataset.name.clone(), dataset.path.clone()))
        }
    }
}
