//! Unpack command implementation.
//!
//! Resolves a ModelKit in local storage and extracts its artifacts.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use modelkit_registry::parse_reference;
use modelkit_unpack::{unpack_reference, UnpackFilter, UnpackOptions, UnpackSummary};

use super::storage_config;

/// Arguments for the unpack command.
#[derive(Args)]
pub struct UnpackArgs {
    /// ModelKit reference (e.g., `myorg/sentiment:v1` or a digest)
    pub reference: String,

    /// Directory to unpack into
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Overwrite existing files
    #[arg(short, long)]
    pub overwrite: bool,

    /// Parts to unpack, comma-separated: config, model, code, datasets
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Local storage root
    #[arg(long, env = "MODELKIT_HOME")]
    pub storage: Option<PathBuf>,
}

/// Builds unpack options from the command arguments.
fn build_options(args: &UnpackArgs) -> Result<UnpackOptions> {
    let filter = match &args.filter {
        Some(filter) => UnpackFilter::parse(filter)?,
        None => UnpackFilter::all(),
    };
    Ok(UnpackOptions::new(&args.dir)
        .with_filter(filter)
        .with_overwrite(args.overwrite))
}

/// Executes the unpack command.
///
/// The unpack runs on a blocking thread; Ctrl-C cancels it between reads.
///
/// # Errors
///
/// Returns an error if:
/// - The reference cannot be parsed
/// - The ModelKit is not in local storage
/// - Any artifact cannot be extracted
pub async fn execute(args: UnpackArgs) -> Result<()> {
    let (reference, extra_tags) = parse_reference(&args.reference)
        .with_context(|| format!("Invalid reference '{}'", args.reference))?;
    if !extra_tags.is_empty() {
        warn!(tags = ?extra_tags, "Additional tags are ignored when unpacking");
    }
    let options = build_options(&args)?;
    let store = storage_config(args.storage.as_ref()).open(&reference);

    info!(
        reference = %reference,
        dir = %options.root.display(),
        "Unpacking ModelKit"
    );

    let cancel = CancellationToken::new();
    let name = reference.reference.clone();
    let mut task = {
        let cancel = cancel.clone();
        let options = options.clone();
        tokio::task::spawn_blocking(move || unpack_reference(&store, &name, &options, &cancel))
    };

    let joined = tokio::select! {
        joined = &mut task => joined,
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling unpack");
            cancel.cancel();
            task.await
        }
    };

    let summary = joined
        .context("Unpack task failed")?
        .with_context(|| format!("Failed to unpack {reference}"))?;

    print_summary(&summary, &options);
    Ok(())
}

fn print_summary(summary: &UnpackSummary, options: &UnpackOptions) {
    println!("Unpacked to {}", options.root.display());
    if summary.config {
        println!("  Kitfile:  ✓");
    }
    println!("  Model:    {}", summary.model);
    println!("  Code:     {}", summary.code);
    println!("  Datasets: {}", summary.datasets);
}
