//! Local storage configuration.

use std::path::{Path, PathBuf};

use crate::layout::LocalLayoutStore;
use crate::reference::Reference;

/// Environment variable overriding the default storage root.
pub const STORAGE_ENV: &str = "MODELKIT_HOME";

/// Where local ModelKit storage lives.
///
/// Each repository is an OCI image layout at
/// `<root>/<registry>/<repository>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Storage root (default: `$MODELKIT_HOME`, else the user data
    /// directory joined with `modelkit`).
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

impl StorageConfig {
    /// Creates a configuration rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Sets the storage root.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Returns the layout directory for a reference's repository.
    #[must_use]
    pub fn repo_path(&self, reference: &Reference) -> PathBuf {
        reference.repo_path(&self.root)
    }

    /// Opens the local layout store for a reference's repository.
    #[must_use]
    pub fn open(&self, reference: &Reference) -> LocalLayoutStore {
        let path = self.repo_path(reference);
        tracing::debug!(path = %path.display(), reference = %reference, "Opening local storage");
        LocalLayoutStore::new(path)
    }

    /// Returns the storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn default_storage_root() -> PathBuf {
    if let Some(home) = std::env::var_os(STORAGE_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(home);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("modelkit")
}
