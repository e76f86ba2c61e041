//! Path containment and pre-existence checks.
//!
//! Containment is decided lexically: `.` and `..` components are folded
//! without touching the filesystem, so a destination can be verified before
//! anything under the root exists. [`check_ancestors`] then inspects what is
//! already on disk between the root and a path.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::UnpackError;

/// The kind of filesystem object about to be written at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Any existing object conflicts only when overwriting is off.
    Any,
    /// A directory.
    Directory,
    /// A regular file.
    File,
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "path"),
            Self::Directory => write!(f, "directory"),
            Self::File => write!(f, "regular file"),
        }
    }
}

/// Folds `.` and `..` out of a relative path.
///
/// Returns `None` if the path is absolute or climbs above its start.
fn normalize_relative(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

/// Resolves a Kitfile-declared path under `root`.
///
/// Returns the joined destination and its normalized path relative to the
/// root.
///
/// # Errors
///
/// Returns [`UnpackError::PathEscape`] if `subpath` is absolute, climbs out
/// of the root, or resolves to the root itself.
pub fn verify_subpath(root: &Path, subpath: &str) -> Result<(PathBuf, PathBuf), UnpackError> {
    let escape = || UnpackError::PathEscape {
        path: PathBuf::from(subpath),
        root: root.to_path_buf(),
    };
    let relative = normalize_relative(Path::new(subpath)).ok_or_else(escape)?;
    if relative.as_os_str().is_empty() {
        return Err(escape());
    }
    Ok((root.join(&relative), relative))
}

/// Resolves an archive entry extracted into `base` (a directory under
/// `root`, given relative to it).
///
/// Returns `None` for entries naming `base` itself, such as `./`.
///
/// # Errors
///
/// Returns [`UnpackError::PathEscape`] if the entry is absolute or resolves
/// outside the root.
pub(crate) fn resolve_entry(
    root: &Path,
    base: &Path,
    entry: &Path,
) -> Result<Option<PathBuf>, UnpackError> {
    let escape = || UnpackError::PathEscape {
        path: entry.to_path_buf(),
        root: root.to_path_buf(),
    };
    if entry.has_root() {
        return Err(escape());
    }
    let relative = normalize_relative(&base.join(entry)).ok_or_else(escape)?;
    if relative == base {
        return Ok(None);
    }
    if relative.as_os_str().is_empty() {
        return Err(escape());
    }
    Ok(Some(root.join(relative)))
}

/// Checks the existing directories between `root` and the parent of `path`.
///
/// `path` must lie under `root`. Each ancestor below the root that exists
/// must be a real directory: a symbolic link would redirect writes outside
/// the root, and anything else cannot hold `path`. The walk stops at the
/// first missing ancestor.
///
/// # Errors
///
/// Returns [`UnpackError::PathEscape`] for a symlinked ancestor,
/// [`UnpackError::PathTypeConflict`] for one that is not a directory, or
/// [`UnpackError::Io`] if an ancestor cannot be inspected.
pub(crate) fn check_ancestors(root: &Path, path: &Path) -> Result<(), UnpackError> {
    let Ok(relative) = path.strip_prefix(root) else {
        return Err(UnpackError::PathEscape {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        });
    };
    let Some(parent) = relative.parent() else {
        return Ok(());
    };

    let mut current = root.to_path_buf();
    for component in parent.components() {
        current.push(component);
        let metadata = match fs::symlink_metadata(&current) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(UnpackError::io(&current, e)),
        };
        let file_type = metadata.file_type();
        if file_type.is_symlink() {
            return Err(UnpackError::PathEscape {
                path: path.to_path_buf(),
                root: root.to_path_buf(),
            });
        }
        if !file_type.is_dir() {
            return Err(UnpackError::PathTypeConflict {
                path: current,
                expected: PathKind::Directory,
            });
        }
    }
    Ok(())
}

/// Applies the pre-existence rule to `path`.
///
/// A missing path passes. An existing path fails with
/// [`UnpackError::PathExists`] unless `overwrite` is set, and then must be of
/// the `expected` kind. Symbolic links are never followed and never match.
///
/// # Errors
///
/// Returns [`UnpackError::PathExists`], [`UnpackError::PathTypeConflict`], or
/// [`UnpackError::Io`] if the path cannot be inspected.
pub(crate) fn check_existing(
    path: &Path,
    expected: PathKind,
    overwrite: bool,
) -> Result<(), UnpackError> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(UnpackError::io(path, e)),
    };

    if !overwrite {
        return Err(UnpackError::PathExists {
            path: path.to_path_buf(),
        });
    }

    let file_type = metadata.file_type();
    let matches = match expected {
        PathKind::Any => true,
        PathKind::Directory => file_type.is_dir(),
        PathKind::File => file_type.is_file(),
    };
    if !matches {
        return Err(UnpackError::PathTypeConflict {
            path: path.to_path_buf(),
            expected,
        });
    }

    tracing::debug!(path = %path.display(), "Path already exists, overwriting");
    Ok(())
}
