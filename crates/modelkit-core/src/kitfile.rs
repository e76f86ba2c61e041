//! The Kitfile: a ModelKit's config document.
//!
//! The Kitfile names the artifacts packed into a ModelKit and the paths,
//! relative to an unpack directory, where each of them belongs. It travels
//! as JSON inside the registry and is written to disk as YAML.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// File name a Kitfile is written under when a ModelKit is unpacked.
pub const KITFILE_NAME: &str = "Kitfile";

/// A ModelKit config document.
///
/// # Examples
///
/// ```rust
/// use modelkit_core::{Code, Kitfile, Model};
///
/// let kitfile = Kitfile {
///     manifest_version: "1.0".to_string(),
///     model: Some(Model::new("models/model.onnx")),
///     code: vec![Code::new("src")],
///     ..Default::default()
/// };
///
/// let yaml = kitfile.to_yaml().unwrap();
/// assert_eq!(Kitfile::from_yaml(&yaml).unwrap(), kitfile);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kitfile {
    /// Kitfile format version.
    #[serde(default)]
    pub manifest_version: String,

    /// Package metadata.
    #[serde(default, rename = "package", skip_serializing_if = "Package::is_empty")]
    pub package: Package,

    /// The trained model, if the kit carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<Model>,

    /// Code artifacts, in packing order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub code: Vec<Code>,

    /// Dataset artifacts, in packing order.
    #[serde(default, rename = "datasets", skip_serializing_if = "Vec::is_empty")]
    pub datasets: Vec<DataSet>,
}

/// Package-level metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Package {
    /// Package name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Package version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// License identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    /// Package authors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
}

impl Package {
    /// Returns true if no package field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// The trained model entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Model {
    /// Model name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Destination path relative to the unpack directory.
    pub path: String,

    /// Framework the model targets (e.g. `onnx`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,

    /// Model version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// License identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

impl Model {
    /// Creates a model entry with the given path.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

/// A code entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Code {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Destination path relative to the unpack directory.
    pub path: String,

    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// License identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

impl Code {
    /// Creates a code entry with the given path.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

/// A dataset entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataSet {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Destination path relative to the unpack directory.
    pub path: String,

    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// License identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    /// Preprocessing notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocessing: Option<String>,
}

impl DataSet {
    /// Creates a named dataset entry with the given path.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            path: path.into(),
            ..Default::default()
        }
    }
}

impl Kitfile {
    /// Parses a Kitfile from its JSON blob form.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid Kitfile document.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serializes the Kitfile to its JSON blob form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses a Kitfile from YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid Kitfile document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Serializes the Kitfile to YAML, the form written to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Finds the code entry whose path is `path`, with its index.
    #[must_use]
    pub fn code_by_path(&self, path: &str) -> Option<(usize, &Code)> {
        self.code.iter().enumerate().find(|(_, c)| c.path == path)
    }

    /// Finds the dataset entry whose path is `path`, with its index.
    #[must_use]
    pub fn dataset_by_path(&self, path: &str) -> Option<(usize, &DataSet)> {
        self.datasets.iter().enumerate().find(|(_, d)| d.path == path)
    }
}
