//! Layer and config extraction.

use std::fs::{self, DirBuilder, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};

use flate2::read::GzDecoder;
use modelkit_core::Kitfile;
use modelkit_registry::{CancellableReader, ContentStore};
use tar::Archive;
use tokio_util::sync::CancellationToken;

use crate::error::UnpackError;
use crate::filesystem::{check_ancestors, check_existing, resolve_entry, PathKind};
use crate::plan::PlannedLayer;

/// Mode of the written Kitfile.
const CONFIG_MODE: u32 = 0o644;

/// Permission bits honoured from archive headers.
const MODE_MASK: u32 = 0o777;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Writes the Kitfile as YAML to `path`.
pub(crate) fn write_config(
    config: &Kitfile,
    path: &Path,
    overwrite: bool,
) -> Result<(), UnpackError> {
    check_existing(path, PathKind::File, overwrite)?;
    let yaml = config.to_yaml().map_err(UnpackError::ConfigSerialize)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| UnpackError::io(parent, e))?;
    }
    let mut file = create_file(path, CONFIG_MODE)?;
    file.write_all(yaml.as_bytes()).map_err(|e| UnpackError::io(path, e))?;

    tracing::info!(path = %path.display(), "Unpacked config");
    Ok(())
}

/// Fetches one layer and extracts it into the parent of its destination.
pub(crate) fn extract_layer<S>(
    store: &S,
    layer: &PlannedLayer,
    root: &Path,
    overwrite: bool,
    cancel: &CancellationToken,
) -> Result<(), UnpackError>
where
    S: ContentStore + ?Sized,
{
    if cancel.is_cancelled() {
        return Err(UnpackError::Cancelled);
    }
    let digest = layer.descriptor.digest.as_str();
    let reader = store
        .fetch(&layer.descriptor)
        .map_err(|source| UnpackError::Fetch {
            digest: digest.to_string(),
            source,
        })?;

    let base = layer.base();
    let target = root.join(base);
    check_ancestors(root, &target)?;
    fs::create_dir_all(&target).map_err(|e| UnpackError::io(&target, e))?;

    let read_error = |source: io::Error| {
        if cancel.is_cancelled() {
            UnpackError::Cancelled
        } else {
            UnpackError::Archive {
                digest: digest.to_string(),
                source,
            }
        }
    };

    let mut archive = Archive::new(GzDecoder::new(CancellableReader::new(reader, cancel)));
    for entry in archive.entries().map_err(read_error)? {
        if cancel.is_cancelled() {
            return Err(UnpackError::Cancelled);
        }
        let mut entry = entry.map_err(read_error)?;
        let entry_path = entry.path().map_err(read_error)?.into_owned();

        let Some(out) = resolve_entry(root, base, &entry_path)? else {
            tracing::debug!(entry = %entry_path.display(), "Skipping entry for extraction directory");
            continue;
        };

        check_ancestors(root, &out)?;
        let header = entry.header();
        let entry_type = header.entry_type();
        let mode = header.mode().map_err(read_error)? & MODE_MASK;

        if entry_type.is_dir() {
            check_existing(&out, PathKind::Directory, overwrite)?;
            tracing::debug!(path = %out.display(), "Creating directory");
            create_dir(&out, mode)?;
        } else if entry_type.is_file() {
            check_existing(&out, PathKind::File, overwrite)?;
            let expected = header.size().map_err(read_error)?;
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent).map_err(|e| UnpackError::io(parent, e))?;
            }

            tracing::debug!(path = %out.display(), size = expected, "Extracting file");
            let mut file = create_file(&out, mode)?;
            let written = copy_entry(&mut entry, &mut file, &out, &read_error)?;
            if written != expected {
                return Err(UnpackError::ShortWrite {
                    path: out,
                    expected,
                    written,
                });
            }
        } else {
            return Err(UnpackError::UnsupportedEntry {
                path: entry_path,
                kind: format!("{entry_type:?}"),
            });
        }
    }

    // The archive ends before the compressed stream does; read the rest so
    // the store sees end of stream and can verify the blob.
    let mut decoder = archive.into_inner();
    io::copy(&mut decoder, &mut io::sink()).map_err(read_error)?;
    let mut remainder = decoder.into_inner();
    io::copy(&mut remainder, &mut io::sink()).map_err(read_error)?;

    Ok(())
}

/// Copies an entry's data, keeping archive read failures apart from write
/// failures on `path`.
fn copy_entry(
    entry: &mut impl Read,
    file: &mut fs::File,
    path: &Path,
    read_error: &dyn Fn(io::Error) -> UnpackError,
) -> Result<u64, UnpackError> {
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut written = 0;
    loop {
        let n = match entry.read(&mut buf) {
            Ok(0) => return Ok(written),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_error(e)),
        };
        file.write_all(&buf[..n]).map_err(|e| UnpackError::io(path, e))?;
        written += n as u64;
    }
}

fn create_dir(path: &Path, mode: u32) -> Result<(), UnpackError> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;
    builder.create(path).map_err(|e| UnpackError::io(path, e))
}

fn create_file(path: &Path, mode: u32) -> Result<fs::File, UnpackError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;
    options.open(path).map_err(|e| UnpackError::io(path, e))
}
