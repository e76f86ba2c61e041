//! OCI image specification types.
//!
//! This module defines the subset of the OCI image specification that
//! ModelKits are built from: descriptors, image manifests and image indexes,
//! plus the media types that mark a manifest as a ModelKit.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Annotation binding a human-readable tag to an index entry.
pub const ANNOTATION_REF_NAME: &str = "org.opencontainers.image.ref.name";

/// Annotation naming the Kitfile entry path a code or dataset layer
/// unpacks to.
pub const ANNOTATION_ENTRY_PATH: &str = "ml.kitops.modelkit.entry-path";

/// OCI media types for ModelKit artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType(String);

impl MediaType {
    /// OCI image manifest media type.
    pub const OCI_MANIFEST: &'static str = "application/vnd.oci.image.manifest.v1+json";

    /// OCI image index media type.
    pub const OCI_INDEX: &'static str = "application/vnd.oci.image.index.v1+json";

    /// ModelKit config (Kitfile) media type.
    pub const MODEL_CONFIG: &'static str = "application/vnd.kitops.modelkit.config.v1+json";

    /// ModelKit model layer media type.
    pub const MODEL_LAYER: &'static str = "application/vnd.kitops.modelkit.model.v1.tar+gzip";

    /// ModelKit code layer media type.
    pub const CODE_LAYER: &'static str = "application/vnd.kitops.modelkit.code.v1.tar+gzip";

    /// ModelKit dataset layer media type.
    pub const DATASET_LAYER: &'static str = "application/vnd.kitops.modelkit.dataset.v1.tar+gzip";

    /// Creates a new media type.
    #[must_use]
    pub fn new(media_type: impl Into<String>) -> Self {
        Self(media_type.into())
    }

    /// Returns the media type string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creates the OCI manifest media type.
    #[must_use]
    pub fn oci_manifest() -> Self {
        Self::new(Self::OCI_MANIFEST)
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MediaType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Serialize for MediaType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MediaType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self(s))
    }
}

/// OCI content descriptor.
///
/// A descriptor describes the disposition of targeted content. It includes
/// the type of the content, a content identifier (digest), and the byte-size
/// of the raw content. The digest is the blob's immutable identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the referenced content.
    pub media_type: MediaType,

    /// Digest of the targeted content.
    pub digest: String,

    /// Size in bytes of the content.
    pub size: u64,

    /// Optional annotations (key-value metadata).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<HashMap<String, String>>,
}

impl Descriptor {
    /// Creates a new descriptor.
    ///
    /// # Examples
    ///
    /// ```
    /// use modelkit_core::{Descriptor, MediaType};
    ///
    /// let desc = Descriptor::new(MediaType::MODEL_LAYER, "sha256:abc123...", 1024);
    /// assert_eq!(desc.size, 1024);
    /// ```
    #[must_use]
    pub fn new(media_type: impl Into<MediaType>, digest: impl Into<String>, size: u64) -> Self {
        Self {
            media_type: media_type.into(),
            digest: digest.into(),
            size,
            annotations: None,
        }
    }

    /// Adds an annotation to the descriptor.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Returns the value of an annotation, if present.
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }

    /// Returns the tag bound to this descriptor in an index, if any.
    ///
    /// Empty ref-name annotations are treated as absent.
    #[must_use]
    pub fn ref_name(&self) -> Option<&str> {
        self.annotation(ANNOTATION_REF_NAME).filter(|s| !s.is_empty())
    }

    /// Returns true if this descriptor has the given media type.
    #[must_use]
    pub fn is_media_type(&self, media_type: &str) -> bool {
        self.media_type.as_str() == media_type
    }
}

/// OCI image manifest.
///
/// For a ModelKit the config descriptor points at a Kitfile and the layers
/// hold the model, code and datasets in packing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Schema version (always 2).
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Media type of this manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,

    /// Configuration descriptor.
    pub config: Descriptor,

    /// Layers that make up the artifact, in packing order.
    #[serde(default)]
    pub layers: Vec<Descriptor>,

    /// Optional annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<HashMap<String, String>>,
}

const fn default_schema_version() -> u32 {
    2
}

impl Manifest {
    /// Creates a new manifest with the given config and layers.
    ///
    /// # Examples
    ///
    /// ```
    /// use modelkit_core::{Descriptor, Manifest, MediaType};
    ///
    /// let config = Descriptor::new(MediaType::MODEL_CONFIG, "sha256:cfg", 120);
    /// let model = Descriptor::new(MediaType::MODEL_LAYER, "sha256:model", 4096);
    ///
    /// let manifest = Manifest::new(config, vec![model]);
    /// assert!(manifest.is_modelkit());
    /// ```
    #[must_use]
    pub fn new(config: Descriptor, layers: Vec<Descriptor>) -> Self {
        Self {
            schema_version: 2,
            media_type: Some(MediaType::oci_manifest()),
            config,
            layers,
            annotations: None,
        }
    }

    /// Returns true if the config descriptor identifies a ModelKit config.
    #[must_use]
    pub fn is_modelkit(&self) -> bool {
        self.config.is_media_type(MediaType::MODEL_CONFIG)
    }
}

/// OCI image index.
///
/// In a local layout the index lists every stored manifest; tags are bound
/// to entries with the [`ANNOTATION_REF_NAME`] annotation, so one digest may
/// appear several times.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    /// Schema version (always 2).
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Media type of this index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,

    /// Manifests referenced by the index.
    #[serde(default)]
    pub manifests: Vec<Descriptor>,
}

impl Index {
    /// Creates an index over the given manifest descriptors.
    #[must_use]
    pub fn new(manifests: Vec<Descriptor>) -> Self {
        Self {
            schema_version: 2,
            media_type: Some(MediaType::new(MediaType::OCI_INDEX)),
            manifests,
        }
    }

    /// Finds the first entry tagged with `tag`.
    #[must_use]
    pub fn find_tag(&self, tag: &str) -> Option<&Descriptor> {
        self.manifests.iter().find(|d| d.ref_name() == Some(tag))
    }

    /// Finds the first entry with the given digest.
    #[must_use]
    pub fn find_digest(&self, digest: &str) -> Option<&Descriptor> {
        self.manifests.iter().find(|d| d.digest == digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_with_annotation() {
        let desc = Descriptor::new(MediaType::MODEL_LAYER, "sha256:abc123", 100)
            .with_annotation("version", "1.2.0");

        assert_eq!(desc.annotation("version"), Some("1.2.0"));
        assert_eq!(desc.annotation("missing"), None);
    }

    #[test]
    fn test_descriptor_ref_name_ignores_empty() {
        let tagged = Descriptor::new(MediaType::OCI_MANIFEST, "sha256:a", 1)
            .with_annotation(ANNOTATION_REF_NAME, "v1");
        let empty = Descriptor::new(MediaType::OCI_MANIFEST, "sha256:a", 1)
            .with_annotation(ANNOTATION_REF_NAME, "");

        assert_eq!(tagged.ref_name(), Some("v1"));
        assert_eq!(empty.ref_name(), None);
    }

    #[test]
    fn test_manifest_is_modelkit() {
        let config = Descriptor::new(MediaType::MODEL_CONFIG, "sha256:cfg", 10);
        assert!(Manifest::new(config, vec![]).is_modelkit());

        let image_config =
            Descriptor::new("application/vnd.oci.image.config.v1+json", "sha256:cfg", 10);
        assert!(!Manifest::new(image_config, vec![]).is_modelkit());
    }

    #[test]
    fn test_manifest_deserialization() {
        let json = r#"{
            "schemaVersion": 2,
            "config": {
                "mediaType": "application/vnd.kitops.modelkit.config.v1+json",
                "digest": "sha256:cfg",
                "size": 42
            },
            "layers": [
                {
                    "mediaType": "application/vnd.kitops.modelkit.model.v1.tar+gzip",
                    "digest": "sha256:model",
                    "size": 1024
                }
            ]
        }"#;

        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert!(manifest.is_modelkit());
        assert_eq!(manifest.layers.len(), 1);
        assert_eq!(manifest.layers[0].size, 1024);
    }

    #[test]
    fn test_manifest_serialization() {
        let config = Descriptor::new(MediaType::MODEL_CONFIG, "sha256:cfg", 10);
        let json = serde_json::to_string(&Manifest::new(config, vec![])).unwrap();
        assert!(json.contains("schemaVersion"));
        assert!(json.contains("mediaType"));
        assert!(!json.contains("annotations"));
    }

    #[test]
    fn test_index_lookup() {
        let index = Index::new(vec![
            Descriptor::new(MediaType::OCI_MANIFEST, "sha256:one", 1)
                .with_annotation(ANNOTATION_REF_NAME, "latest"),
            Descriptor::new(MediaType::OCI_MANIFEST, "sha256:two", 1),
        ]);

        assert_eq!(index.find_tag("latest").unwrap().digest, "sha256:one");
        assert!(index.find_tag("v2").is_none());
        assert!(index.find_digest("sha256:two").is_some());
    }
}
