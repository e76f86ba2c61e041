//! Manifest and Kitfile resolution.
//!
//! Every function here is stateless and read-only: documents are fetched
//! fresh from the store on each call and validated before they are
//! returned. The composite helpers return both documents or an error, never
//! one without the other.

use std::io::Read;

use modelkit_core::{Descriptor, Kitfile, Manifest, MediaType};
use tokio_util::sync::CancellationToken;

use crate::error::{RegistryError, StoreError};
use crate::store::{CancellableReader, ContentStore};

/// Returns the manifest described by `descriptor`.
///
/// # Errors
///
/// - [`RegistryError::NotFound`] if the blob cannot be fetched or read
/// - [`RegistryError::ManifestParse`] if it is not a manifest document
/// - [`RegistryError::WrongArtifactType`] if the manifest's config is not a
///   Kitfile, i.e. the content exists but is not a ModelKit
/// - [`RegistryError::Cancelled`] if `cancel` fires
pub fn get_manifest<S>(
    store: &S,
    descriptor: &Descriptor,
    cancel: &CancellationToken,
) -> Result<Manifest, RegistryError>
where
    S: ContentStore + ?Sized,
{
    let bytes = fetch_all(store, descriptor, cancel)?;
    let manifest: Manifest =
        serde_json::from_slice(&bytes).map_err(|e| RegistryError::ManifestParse {
            digest: descriptor.digest.clone(),
            source: e,
        })?;

    if !manifest.is_modelkit() {
        return Err(RegistryError::WrongArtifactType {
            digest: descriptor.digest.clone(),
            media_type: manifest.config.media_type.to_string(),
        });
    }

    tracing::debug!(
        digest = %descriptor.digest,
        layers = manifest.layers.len(),
        "Fetched manifest"
    );
    Ok(manifest)
}

/// Returns the Kitfile described by `descriptor`.
///
/// The descriptor's media type is checked before anything is fetched.
///
/// # Errors
///
/// - [`RegistryError::WrongArtifactType`] if the descriptor is not a Kitfile
/// - [`RegistryError::NotFound`] if the blob cannot be fetched or read
/// - [`RegistryError::ConfigParse`] if the blob is not a valid Kitfile
/// - [`RegistryError::Cancelled`] if `cancel` fires
pub fn get_config<S>(
    store: &S,
    descriptor: &Descriptor,
    cancel: &CancellationToken,
) -> Result<Kitfile, RegistryError>
where
    S: ContentStore + ?Sized,
{
    if !descriptor.is_media_type(MediaType::MODEL_CONFIG) {
        return Err(RegistryError::WrongArtifactType {
            digest: descriptor.digest.clone(),
            media_type: descriptor.media_type.to_string(),
        });
    }

    let bytes = fetch_all(store, descriptor, cancel)?;
    let kitfile = serde_json::from_slice(&bytes).map_err(|e| RegistryError::ConfigParse {
        digest: descriptor.digest.clone(),
        source: e,
    })?;

    tracing::debug!(digest = %descriptor.digest, "Fetched config");
    Ok(kitfile)
}

/// Returns the manifest and Kitfile for a manifest descriptor.
///
/// # Errors
///
/// Returns the first error from [`get_manifest`] or [`get_config`].
pub fn get_manifest_and_config<S>(
    store: &S,
    descriptor: &Descriptor,
    cancel: &CancellationToken,
) -> Result<(Manifest, Kitfile), RegistryError>
where
    S: ContentStore + ?Sized,
{
    let manifest = get_manifest(store, descriptor, cancel)?;
    let config = get_config(store, &manifest.config, cancel)?;
    Ok((manifest, config))
}

/// Resolves a tag or digest and returns its manifest.
///
/// # Errors
///
/// Returns [`RegistryError::NotFound`] if the store does not know
/// `reference`, otherwise any error from [`get_manifest`].
pub fn resolve_manifest<S>(
    store: &S,
    reference: &str,
    cancel: &CancellationToken,
) -> Result<Manifest, RegistryError>
where
    S: ContentStore + ?Sized,
{
    let descriptor = resolve_descriptor(store, reference, cancel)?;
    get_manifest(store, &descriptor, cancel)
}

/// Resolves a tag or digest and returns its manifest and Kitfile.
///
/// # Errors
///
/// Returns the first error from [`resolve_manifest`] or [`get_config`].
pub fn resolve_manifest_and_config<S>(
    store: &S,
    reference: &str,
    cancel: &CancellationToken,
) -> Result<(Manifest, Kitfile), RegistryError>
where
    S: ContentStore + ?Sized,
{
    let manifest = resolve_manifest(store, reference, cancel)?;
    let config = get_config(store, &manifest.config, cancel)?;
    Ok((manifest, config))
}

fn resolve_descriptor<S>(
    store: &S,
    reference: &str,
    cancel: &CancellationToken,
) -> Result<Descriptor, RegistryError>
where
    S: ContentStore + ?Sized,
{
    if cancel.is_cancelled() {
        return Err(RegistryError::Cancelled);
    }
    store
        .resolve(reference)
        .map_err(|source| RegistryError::NotFound {
            reference: reference.to_string(),
            source,
        })
}

/// Reads a whole blob, observing cancellation.
fn fetch_all<S>(
    store: &S,
    descriptor: &Descriptor,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, RegistryError>
where
    S: ContentStore + ?Sized,
{
    if cancel.is_cancelled() {
        return Err(RegistryError::Cancelled);
    }
    let not_found = |source| RegistryError::NotFound {
        reference: descriptor.digest.clone(),
        source,
    };

    let reader = store.fetch(descriptor).map_err(not_found)?;
    let mut bytes = Vec::new();
    if let Err(e) = CancellableReader::new(reader, cancel).read_to_end(&mut bytes) {
        if cancel.is_cancelled() {
            return Err(RegistryError::Cancelled);
        }
        return Err(not_found(StoreError::Read {
            digest: descriptor.digest.clone(),
            source: e,
        }));
    }
    Ok(bytes)
}
