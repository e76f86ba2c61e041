//! CLI commands and argument parsing.

pub mod tags;
pub mod unpack;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use modelkit_registry::StorageConfig;

/// ModelKit - package and unpack machine learning artifacts
#[derive(Parser)]
#[command(name = "modelkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Unpack a ModelKit from local storage into a directory
    Unpack(unpack::UnpackArgs),

    /// List the tags bound to a ModelKit in local storage
    Tags(tags::TagsArgs),

    /// Print version information
    Version,
}

/// Returns the storage configuration for an optional `--storage` root.
fn storage_config(root: Option<&PathBuf>) -> StorageConfig {
    root.map_or_else(StorageConfig::default, StorageConfig::new)
}
