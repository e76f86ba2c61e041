//! Tags command implementation.
//!
//! Lists every tag bound to the manifest a reference resolves to.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use modelkit_registry::{
    format_repository_for_display, get_tags_for_descriptor, parse_reference, ContentStore,
    Reference,
};

use super::storage_config;

/// Arguments for the tags command.
#[derive(Args)]
pub struct TagsArgs {
    /// ModelKit reference (e.g., `myorg/sentiment:v1` or a digest)
    pub reference: String,

    /// Local storage root
    #[arg(long, env = "MODELKIT_HOME")]
    pub storage: Option<PathBuf>,
}

/// Runs the tags command.
///
/// # Errors
///
/// Returns an error if the reference is invalid or not in local storage.
pub fn run(args: &TagsArgs) -> Result<()> {
    let (reference, tags) = lookup_tags(args)?;
    let repository = format_repository_for_display(&reference.name());

    if tags.is_empty() {
        let label = if repository.is_empty() {
            reference.reference.as_str()
        } else {
            repository.as_str()
        };
        println!("{label}: no tags");
    }
    for tag in &tags {
        println!("{}", tag_line(&repository, &reference, tag));
    }
    Ok(())
}

/// Formats one output line. A bare digest has no repository to show, so the
/// digest follows the tag instead.
fn tag_line(repository: &str, reference: &Reference, tag: &str) -> String {
    if repository.is_empty() {
        format!("{tag}@{}", reference.reference)
    } else {
        format!("{repository}:{tag}")
    }
}

fn lookup_tags(args: &TagsArgs) -> Result<(Reference, Vec<String>)> {
    let (reference, _) = parse_reference(&args.reference)
        .with_context(|| format!("Invalid reference '{}'", args.reference))?;
    let store = storage_config(args.storage.as_ref()).open(&reference);

    let descriptor = store
        .resolve(&reference.reference)
        .with_context(|| format!("ModelKit {reference} not found in local storage"))?;
    let tags = get_tags_for_descriptor(&store, &descriptor).context("Failed to read local index")?;
    Ok((reference, tags))
}
