//! Unpack options.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::UnpackError;

/// Which parts of a ModelKit to unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnpackFilter {
    /// Write the Kitfile.
    pub config: bool,
    /// Extract model layers.
    pub model: bool,
    /// Extract code layers.
    pub code: bool,
    /// Extract dataset layers.
    pub datasets: bool,
}

impl Default for UnpackFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl UnpackFilter {
    /// Selects everything.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            config: true,
            model: true,
            code: true,
            datasets: true,
        }
    }

    /// Selects nothing.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            config: false,
            model: false,
            code: false,
            datasets: false,
        }
    }

    /// Parses a comma-separated selection such as `model,code`.
    ///
    /// Accepted names are `config` (or `kitfile`), `model`, `code` and
    /// `datasets` (or `dataset`), case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`UnpackError::InvalidFilter`] for an unknown or empty name.
    pub fn parse(filter: &str) -> Result<Self, UnpackError> {
        let mut selected = Self::none();
        for name in filter.split(',').map(str::trim) {
            match name.to_ascii_lowercase().as_str() {
                "config" | "kitfile" => selected.config = true,
                "model" => selected.model = true,
                "code" => selected.code = true,
                "datasets" | "dataset" => selected.datasets = true,
                _ => {
                    return Err(UnpackError::InvalidFilter {
                        filter: name.to_string(),
                    })
                }
            }
        }
        Ok(selected)
    }
}

impl FromStr for UnpackFilter {
    type Err = UnpackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Options for a single unpack.
///
/// # Examples
///
/// ```rust
/// use modelkit_unpack::{UnpackFilter, UnpackOptions};
///
/// let options = UnpackOptions::new("./out")
///     .with_filter(UnpackFilter::parse("model,code").unwrap())
///     .with_overwrite(true);
///
/// assert!(options.include_model);
/// assert!(!options.include_config);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackOptions {
    /// Directory every artifact is unpacked under.
    pub root: PathBuf,
    /// Write the Kitfile to `<root>/Kitfile`.
    pub include_config: bool,
    /// Extract model layers.
    pub include_model: bool,
    /// Extract code layers.
    pub include_code: bool,
    /// Extract dataset layers.
    pub include_datasets: bool,
    /// Replace existing files and reuse existing directories.
    pub overwrite: bool,
}

impl UnpackOptions {
    /// Unpacks everything into `root` without overwriting.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include_config: true,
            include_model: true,
            include_code: true,
            include_datasets: true,
            overwrite: false,
        }
    }

    /// Sets whether existing paths may be overwritten.
    #[must_use]
    pub const fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Replaces the selection with `filter`.
    #[must_use]
    pub const fn with_filter(mut self, filter: UnpackFilter) -> Self {
        self.include_config = filter.config;
        self.include_model = filter.model;
        self.include_code = filter.code;
        self.include_datasets = filter.datasets;
        self
    }

    /// Sets whether the Kitfile is written.
    #[must_use]
    pub const fn with_config(mut self, include: bool) -> Self {
        self.include_config = include;
        self
    }

    /// Sets whether model layers are extracted.
    #[must_use]
    pub const fn with_model(mut self, include: bool) -> Self {
        self.include_model = include;
        self
    }

    /// Sets whether code layers are extracted.
    #[must_use]
    pub const fn with_code(mut self, include: bool) -> Self {
        self.include_code = include;
        self
    }

    /// Sets whether dataset layers are extracted.
    #[must_use]
    pub const fn with_datasets(mut self, include: bool) -> Self {
        self.include_datasets = include;
        self
    }
}
