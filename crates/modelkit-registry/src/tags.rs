//! Digest to tag lookup over the local index.

use modelkit_core::Descriptor;

use crate::error::RegistryError;
use crate::store::IndexProvider;

/// Returns every tag bound to the descriptor's digest, in index order.
///
/// Entries without a ref-name annotation, or with an empty one, are not
/// tags and are skipped. An unknown digest yields an empty list.
///
/// # Errors
///
/// Returns [`RegistryError::Store`] if the index cannot be loaded.
pub fn get_tags_for_descriptor<P>(
    provider: &P,
    descriptor: &Descriptor,
) -> Result<Vec<String>, RegistryError>
where
    P: IndexProvider + ?Sized,
{
    let index = provider.index()?;
    let tags: Vec<String> = index
        .manifests
        .iter()
        .filter(|entry| entry.digest == descriptor.digest)
        .filter_map(Descriptor::ref_name)
        .map(str::to_string)
        .collect();

    tracing::debug!(digest = %descriptor.digest, count = tags.len(), "Looked up tags");
    Ok(tags)
}
