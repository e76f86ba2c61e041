//! Complete ModelKit fixtures.
//!
//! A fixture is a Kitfile plus an ordered list of layers. It can be stored
//! in a [`MemoryStore`] or written out as an OCI image layout that
//! [`LocalLayoutStore`](modelkit_registry::LocalLayoutStore) reads.

use std::fs;
use std::path::Path;

use modelkit_core::{
    Code, DataSet, Descriptor, Digest, Index, Kitfile, Manifest, MediaType, Model, Package,
    ANNOTATION_REF_NAME,
};
use modelkit_registry::MemoryStore;

use crate::error::{FixtureError, Result};
use crate::layer::LayerBuilder;

/// A stored ModelKit: the manifest descriptor and the documents behind it.
#[derive(Debug, Clone)]
pub struct StoredModelKit {
    /// Descriptor of the manifest blob.
    pub descriptor: Descriptor,
    /// The manifest.
    pub manifest: Manifest,
    /// The Kitfile referenced by the manifest.
    pub config: Kitfile,
}

#[derive(Debug, Clone)]
struct FixtureLayer {
    media_type: MediaType,
    content: LayerBuilder,
    annotations: Vec<(String, String)>,
}

/// Builder for a ModelKit made of a Kitfile and layers.
///
/// # Examples
///
/// ```rust
/// use modelkit_core::{Kitfile, MediaType, Model};
/// use modelkit_registry::MemoryStore;
/// use modelkit_test::{LayerBuilder, ModelKitFixture};
///
/// let kitfile = Kitfile {
///     model: Some(Model::new("model.bin")),
///     ..Default::default()
/// };
/// let fixture = ModelKitFixture::new(kitfile)
///     .with_layer(MediaType::MODEL_LAYER, LayerBuilder::new().file("model.bin", "w"));
///
/// let mut store = MemoryStore::new();
/// let stored = fixture.insert_into(&mut store, "v1").unwrap();
/// assert_eq!(stored.manifest.layers.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ModelKitFixture {
    config: Kitfile,
    layers: Vec<FixtureLayer>,
}

impl ModelKitFixture {
    /// Creates a fixture with no layers.
    #[must_use]
    pub const fn new(config: Kitfile) -> Self {
        Self {
            config,
            layers: Vec::new(),
        }
    }

    /// A ModelKit with one model, one code directory and one dataset.
    ///
    /// Unpacked, it yields `model.bin`, `src/main.py`, `src/util/helpers.py`
    /// and `data/train.csv`.
    #[must_use]
    pub fn simple() -> Self {
        let config = Kitfile {
            manifest_version: "1.0".to_string(),
            package: Package {
                name: Some("sentiment".to_string()),
                version: Some("1.0.0".to_string()),
                ..Default::default()
            },
            model: Some(Model {
                name: Some("sentiment".to_string()),
                framework: Some("onnx".to_string()),
                ..Model::new("model.bin")
            }),
            code: vec![Code::new("src")],
            datasets: vec![DataSet::new("training", "data/train.csv")],
        };

        Self::new(config)
            .with_layer(
                MediaType::MODEL_LAYER,
                LayerBuilder::new().file("model.bin", "model weights"),
            )
            .with_layer(
                MediaType::CODE_LAYER,
                LayerBuilder::new()
                    .dir("src")
                    .file("src/main.py", "print('inference')\n")
                    .dir("src/util")
                    .file_with_mode("src/util/helpers.py", "def helper(): pass\n", 0o755),
            )
            .with_layer(
                MediaType::DATASET_LAYER,
                LayerBuilder::new().file("train.csv", "text,label\ngood,1\n"),
            )
    }

    /// Appends a layer.
    #[must_use]
    pub fn with_layer(mut self, media_type: &str, content: LayerBuilder) -> Self {
        self.layers.push(FixtureLayer {
            media_type: MediaType::new(media_type),
            content,
            annotations: Vec::new(),
        });
        self
    }

    /// Appends a layer carrying one annotation.
    #[must_use]
    pub fn with_annotated_layer(
        mut self,
        media_type: &str,
        content: LayerBuilder,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.layers.push(FixtureLayer {
            media_type: MediaType::new(media_type),
            content,
            annotations: vec![(key.into(), value.into())],
        });
        self
    }

    /// Returns the fixture's Kitfile.
    #[must_use]
    pub const fn config(&self) -> &Kitfile {
        &self.config
    }

    /// Stores every blob in `store` and tags the manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer or document cannot be encoded.
    pub fn insert_into(&self, store: &mut MemoryStore, tag: &str) -> Result<StoredModelKit> {
        let (blobs, stored, manifest_bytes) = self.assemble()?;
        for (desc, data) in blobs {
            store.insert_blob(desc.media_type, data);
        }
        let descriptor = store.insert_blob(MediaType::OCI_MANIFEST, manifest_bytes);
        store.tag(&descriptor, tag);
        Ok(StoredModelKit {
            descriptor,
            ..stored
        })
    }

    /// Writes an OCI image layout at `dir`, tagging the manifest.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Io`] if a file cannot be written.
    pub fn write_layout(&self, dir: &Path, tag: &str) -> Result<StoredModelKit> {
        let (mut blobs, stored, manifest_bytes) = self.assemble()?;
        let descriptor = descriptor_for(MediaType::OCI_MANIFEST, &manifest_bytes);
        blobs.push((descriptor.clone(), manifest_bytes));

        for (desc, data) in &blobs {
            let digest = Digest::parse(&desc.digest)?;
            let blob_dir = dir.join("blobs").join(digest.algorithm());
            fs::create_dir_all(&blob_dir).map_err(|e| io_error(&blob_dir, e))?;
            let path = blob_dir.join(digest.encoded());
            fs::write(&path, data).map_err(|e| io_error(&path, e))?;
        }

        let index = Index::new(vec![descriptor
            .clone()
            .with_annotation(ANNOTATION_REF_NAME, tag)]);
        let path = dir.join("index.json");
        fs::write(&path, serde_json::to_vec_pretty(&index)?).map_err(|e| io_error(&path, e))?;

        Ok(StoredModelKit {
            descriptor,
            ..stored
        })
    }

    /// Encodes the config and layers, returning every non-manifest blob, the
    /// documents, and the encoded manifest.
    fn assemble(&self) -> Result<(Vec<(Descriptor, Vec<u8>)>, StoredModelKit, Vec<u8>)> {
        let config_bytes = self.config.to_json()?;
        let config_desc = descriptor_for(MediaType::MODEL_CONFIG, &config_bytes);
        let mut blobs = vec![(config_desc.clone(), config_bytes)];

        let mut layers = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let data = layer.content.build()?;
            let mut desc = descriptor_for(layer.media_type.as_str(), &data);
            for (key, value) in &layer.annotations {
                desc = desc.with_annotation(key.clone(), value.clone());
            }
            layers.push(desc.clone());
            blobs.push((desc, data));
        }

        let manifest = Manifest::new(config_desc, layers);
        let manifest_bytes = serde_json::to_vec(&manifest)?;
        let stored = StoredModelKit {
            descriptor: descriptor_for(MediaType::OCI_MANIFEST, &manifest_bytes),
            manifest,
            config: self.config.clone(),
        };
        Ok((blobs, stored, manifest_bytes))
    }
}

fn descriptor_for(media_type: &str, data: &[u8]) -> Descriptor {
    Descriptor::new(
        media_type,
        Digest::sha256_of(data).to_string(),
        data.len() as u64,
    )
}

fn io_error(path: &Path, source: std::io::Error) -> FixtureError {
    FixtureError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_layers_in_order() {
        let mut store = MemoryStore::new();
        let stored = ModelKitFixture::simple()
            .insert_into(&mut store, "v1")
            .unwrap();

        let kinds: Vec<&str> = stored
            .manifest
            .layers
            .iter()
            .map(|l| l.media_type.as_str())
            .collect();
        assert_eq!(
            kinds,
            vec![
                MediaType::MODEL_LAYER,
                MediaType::CODE_LAYER,
                MediaType::DATASET_LAYER
            ]
        );
        // config + 3 layers + manifest
        assert_eq!(store.blob_count(), 5);
    }

    #[test]
    fn test_annotated_layer() {
        let fixture = ModelKitFixture::new(Kitfile::default()).with_annotated_layer(
            MediaType::CODE_LAYER,
            LayerBuilder::new().dir("src"),
            "key",
            "value",
        );
        let mut store = MemoryStore::new();
        let stored = fixture.insert_into(&mut store, "v1").unwrap();
        assert_eq!(stored.manifest.layers[0].annotation("key"), Some("value"));
    }
}
