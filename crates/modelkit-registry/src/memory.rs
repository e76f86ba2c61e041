//! In-memory content store.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use modelkit_core::{Descriptor, Digest, Index, Manifest, MediaType, ANNOTATION_REF_NAME};

use crate::error::StoreError;
use crate::store::{ContentStore, IndexProvider};

/// A [`ContentStore`] and [`IndexProvider`] backed by memory.
///
/// Blobs are keyed by digest; tags are index entries carrying the ref-name
/// annotation, as in an on-disk layout.
///
/// # Examples
///
/// ```
/// use modelkit_core::MediaType;
/// use modelkit_registry::{ContentStore, MemoryStore};
///
/// let mut store = MemoryStore::new();
/// let desc = store.insert_blob(MediaType::MODEL_CONFIG, b"{}".to_vec());
/// store.tag(&desc, "v1");
///
/// assert_eq!(store.resolve("v1").unwrap().digest, desc.digest);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: HashMap<String, (MediaType, Vec<u8>)>,
    index: Vec<Descriptor>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a blob and returns its descriptor.
    pub fn insert_blob(&mut self, media_type: impl Into<MediaType>, data: Vec<u8>) -> Descriptor {
        let media_type = media_type.into();
        let digest = Digest::sha256_of(&data).to_string();
        let desc = Descriptor::new(media_type.clone(), digest.clone(), data.len() as u64);
        self.blobs.insert(digest, (media_type, data));
        desc
    }

    /// Stores a manifest and returns its descriptor.
    ///
    /// # Panics
    ///
    /// Panics if the manifest cannot be serialized, which cannot happen for
    /// the types in `modelkit-core`.
    pub fn insert_manifest(&mut self, manifest: &Manifest) -> Descriptor {
        let data = serde_json::to_vec(manifest).expect("manifest serializes");
        self.insert_blob(MediaType::OCI_MANIFEST, data)
    }

    /// Adds an index entry binding `tag` to the descriptor.
    pub fn tag(&mut self, descriptor: &Descriptor, tag: &str) {
        let entry = Descriptor {
            annotations: None,
            ..descriptor.clone()
        }
        .with_annotation(ANNOTATION_REF_NAME, tag);
        self.index.push(entry);
    }

    /// Adds an untagged index entry.
    pub fn add_index_entry(&mut self, descriptor: Descriptor) {
        self.index.push(descriptor);
    }

    /// Returns the number of stored blobs.
    #[must_use]
    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }
}

impl ContentStore for MemoryStore {
    fn fetch(&self, descriptor: &Descriptor) -> Result<Box<dyn Read + Send + '_>, StoreError> {
        let (_, data) = self
            .blobs
            .get(&descriptor.digest)
            .ok_or_else(|| StoreError::NotFound {
                reference: descriptor.digest.clone(),
            })?;
        Ok(Box::new(Cursor::new(data.as_slice())))
    }

    fn resolve(&self, reference: &str) -> Result<Descriptor, StoreError> {
        let not_found = || StoreError::NotFound {
            reference: reference.to_string(),
        };

        if Digest::is_valid(reference) {
            if let Some(entry) = self.index.iter().find(|d| d.digest == reference) {
                return Ok(Descriptor {
                    annotations: None,
                    ..entry.clone()
                });
            }
            let (media_type, data) = self.blobs.get(reference).ok_or_else(not_found)?;
            return Ok(Descriptor::new(
                media_type.clone(),
                reference,
                data.len() as u64,
            ));
        }

        self.index
            .iter()
            .find(|d| d.ref_name() == Some(reference))
            .map(|d| Descriptor {
                annotations: None,
                ..d.clone()
            })
            .ok_or_else(not_found)
    }
}

impl IndexProvider for MemoryStore {
    fn index(&self) -> Result<Index, StoreError> {
        Ok(Index::new(self.index.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_round_trip() {
        let mut store = MemoryStore::new();
        let desc = store.insert_blob(MediaType::MODEL_LAYER, b"layer".to_vec());

        let mut data = Vec::new();
        store.fetch(&desc).unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"layer");
        assert_eq!(desc.size, 5);
    }

    #[test]
    fn test_fetch_missing() {
        let store = MemoryStore::new();
        let desc = Descriptor::new(MediaType::MODEL_LAYER, Digest::sha256_of(b"x").as_str(), 1);
        assert!(matches!(
            store.fetch(&desc),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_tag_and_digest() {
        let mut store = MemoryStore::new();
        let desc = store.insert_blob(MediaType::OCI_MANIFEST, b"{}".to_vec());
        store.tag(&desc, "v1");

        assert_eq!(store.resolve("v1").unwrap(), desc);
        assert_eq!(store.resolve(&desc.digest).unwrap(), desc);
        assert!(store.resolve("v2").is_err());
    }

    #[test]
    fn test_resolve_untagged_blob_by_digest() {
        let mut store = MemoryStore::new();
        let desc = store.insert_blob(MediaType::OCI_MANIFEST, b"{}".to_vec());
        assert_eq!(store.resolve(&desc.digest).unwrap(), desc);
    }
}
