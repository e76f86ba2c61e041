//! Builders for gzip-compressed tar layers.
//!
//! Layer entries are named relative to the parent of the path the layer
//! unpacks to: a model at `models/weights.bin` is a layer holding
//! `weights.bin`, a code directory `src` is a layer holding `src/...`.
//!
//! # Examples
//!
//! ```rust
//! use modelkit_test::LayerBuilder;
//!
//! let layer = LayerBuilder::new()
//!     .dir("src")
//!     .file("src/main.py", "print('hi')")
//!     .build()
//!     .unwrap();
//! assert!(!layer.is_empty());
//! ```

use std::io::{self, Write};

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{EntryType, Header};

use crate::error::{FixtureError, Result};

/// Size of the end-of-archive marker written by [`tar::Builder`].
const END_OF_ARCHIVE: usize = 1024;

#[derive(Debug, Clone)]
enum LayerEntry {
    Dir {
        path: String,
        mode: u32,
    },
    File {
        path: String,
        contents: Vec<u8>,
        mode: u32,
    },
    Symlink {
        path: String,
        target: String,
    },
    /// A regular file whose name is written verbatim, bypassing the
    /// path checks of [`Header::set_path`].
    RawName {
        name: Vec<u8>,
        contents: Vec<u8>,
    },
    /// A regular file whose header declares more bytes than follow it.
    Truncated {
        path: String,
        declared: u64,
        contents: Vec<u8>,
    },
}

/// Fluent builder for layer archives.
#[derive(Debug, Clone, Default)]
pub struct LayerBuilder {
    entries: Vec<LayerEntry>,
}

impl LayerBuilder {
    /// Creates an empty layer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory with mode `0755`.
    #[must_use]
    pub fn dir(self, path: impl Into<String>) -> Self {
        self.dir_with_mode(path, 0o755)
    }

    /// Adds a directory with the given mode.
    #[must_use]
    pub fn dir_with_mode(mut self, path: impl Into<String>, mode: u32) -> Self {
        self.entries.push(LayerEntry::Dir {
            path: path.into(),
            mode,
        });
        self
    }

    /// Adds a regular file with mode `0644`.
    #[must_use]
    pub fn file(self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.file_with_mode(path, contents, 0o644)
    }

    /// Adds a regular file with the given mode.
    #[must_use]
    pub fn file_with_mode(
        mut self,
        path: impl Into<String>,
        contents: impl Into<Vec<u8>>,
        mode: u32,
    ) -> Self {
        self.entries.push(LayerEntry::File {
            path: path.into(),
            contents: contents.into(),
            mode,
        });
        self
    }

    /// Adds a symbolic link.
    #[must_use]
    pub fn symlink(mut self, path: impl Into<String>, target: impl Into<String>) -> Self {
        self.entries.push(LayerEntry::Symlink {
            path: path.into(),
            target: target.into(),
        });
        self
    }

    /// Adds a regular file whose name is stored exactly as given, such as
    /// `../../etc/passwd` or an absolute path. Names longer than 100 bytes
    /// are cut off.
    #[must_use]
    pub fn raw_name(mut self, name: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.entries.push(LayerEntry::RawName {
            name: name.as_bytes().to_vec(),
            contents: contents.into(),
        });
        self
    }

    /// Adds a regular file declaring `declared` bytes but carrying only
    /// `contents`. The archive ends immediately after it, so it must be the
    /// last entry; anything added afterwards is written before it.
    #[must_use]
    pub fn truncated_file(
        mut self,
        path: impl Into<String>,
        declared: u64,
        contents: impl Into<Vec<u8>>,
    ) -> Self {
        self.entries.push(LayerEntry::Truncated {
            path: path.into(),
            declared,
            contents: contents.into(),
        });
        self
    }

    /// Returns the uncompressed tar archive.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Layer`] if an entry cannot be encoded.
    pub fn build_tar(&self) -> Result<Vec<u8>> {
        let mut builder = tar::Builder::new(Vec::new());
        let mut tail = Vec::new();

        for entry in &self.entries {
            match entry {
                LayerEntry::Dir { path, mode } => {
                    let mut header = header(EntryType::Directory, 0, *mode);
                    builder
                        .append_data(&mut header, path, io::empty())
                        .map_err(FixtureError::Layer)?;
                }
                LayerEntry::File {
                    path,
                    contents,
                    mode,
                } => {
                    let mut header = header(EntryType::Regular, contents.len() as u64, *mode);
                    builder
                        .append_data(&mut header, path, contents.as_slice())
                        .map_err(FixtureError::Layer)?;
                }
                LayerEntry::Symlink { path, target } => {
                    let mut header = header(EntryType::Symlink, 0, 0o777);
                    header.set_link_name(target).map_err(FixtureError::Layer)?;
                    builder
                        .append_data(&mut header, path, io::empty())
                        .map_err(FixtureError::Layer)?;
                }
                LayerEntry::RawName { name, contents } => {
                    let mut header = header(EntryType::Regular, contents.len() as u64, 0o644);
                    let field = &mut header.as_old_mut().name;
                    let len = name.len().min(field.len());
                    field[..len].copy_from_slice(&name[..len]);
                    header.set_cksum();
                    builder
                        .append(&header, contents.as_slice())
                        .map_err(FixtureError::Layer)?;
                }
                LayerEntry::Truncated {
                    path,
                    declared,
                    contents,
                } => {
                    let mut header = header(EntryType::Regular, *declared, 0o644);
                    header.set_path(path).map_err(FixtureError::Layer)?;
                    header.set_cksum();
                    tail.extend_from_slice(header.as_bytes());
                    tail.extend_from_slice(contents);
                }
            }
        }

        let mut archive = builder.into_inner().map_err(FixtureError::Layer)?;
        if !tail.is_empty() {
            archive.truncate(archive.len() - END_OF_ARCHIVE);
            archive.extend_from_slice(&tail);
        }
        Ok(archive)
    }

    /// Returns the gzip-compressed tar archive.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Layer`] if an entry cannot be encoded.
    pub fn build(&self) -> Result<Vec<u8>> {
        let tar = self.build_tar()?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&tar).map_err(FixtureError::Layer)?;
        encoder.finish().map_err(FixtureError::Layer)
    }
}

fn header(entry_type: EntryType, size: u64, mode: u32) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_size(size);
    header.set_mode(mode);
    header
}
