//! Integration tests for unpacking ModelKits.
//!
//! ModelKits are built with `modelkit-test` fixtures, stored in memory or as
//! an on-disk OCI layout, and unpacked into temporary directories.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use modelkit_core::{
    Code, DataSet, Descriptor, Kitfile, MediaType, Model, ANNOTATION_ENTRY_PATH, KITFILE_NAME,
};
use modelkit_registry::{ContentStore, LocalLayoutStore, MemoryStore, RegistryError, StoreError};
use modelkit_test::{LayerBuilder, ModelKitFixture, StoredModelKit};
use modelkit_unpack::{
    unpack_modelkit, unpack_reference, PathKind, UnpackError, UnpackFilter, UnpackOptions,
    UnpackSummary,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

fn store(fixture: &ModelKitFixture) -> (MemoryStore, StoredModelKit) {
    let mut store = MemoryStore::new();
    let stored = fixture
        .insert_into(&mut store, "v1")
        .expect("Failed to store fixture");
    (store, stored)
}

fn unpack(
    store: &MemoryStore,
    stored: &StoredModelKit,
    options: &UnpackOptions,
) -> Result<UnpackSummary, UnpackError> {
    unpack_modelkit(
        store,
        &stored.manifest,
        &stored.config,
        options,
        &CancellationToken::new(),
    )
}

/// Lists every path under `dir`, relative and sorted.
fn tree(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| {
            let entry = entry.expect("Failed to walk directory");
            entry.path().strip_prefix(dir).unwrap().to_path_buf()
        })
        .collect()
}

fn model_fixture(layer: LayerBuilder) -> ModelKitFixture {
    let kitfile = Kitfile {
        model: Some(Model::new("model.bin")),
        ..Default::default()
    };
    ModelKitFixture::new(kitfile).with_layer(MediaType::MODEL_LAYER, layer)
}

#[test]
fn test_unpack_simple_modelkit() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("out");
    let (store, stored) = store(&ModelKitFixture::simple());

    let summary = unpack(&store, &stored, &UnpackOptions::new(&root)).unwrap();

    assert_eq!(
        summary,
        UnpackSummary {
            config: true,
            model: 1,
            code: 1,
            datasets: 1,
        }
    );
    assert_eq!(
        tree(&root),
        [
            "Kitfile",
            "data",
            "data/train.csv",
            "model.bin",
            "src",
            "src/main.py",
            "src/util",
            "src/util/helpers.py",
        ]
        .iter()
        .map(PathBuf::from)
        .collect::<Vec<_>>()
    );
    assert_eq!(
        fs::read_to_string(root.join("model.bin")).unwrap(),
        "model weights"
    );
    assert_eq!(
        fs::read_to_string(root.join("data/train.csv")).unwrap(),
        "text,label\ngood,1\n"
    );
}

#[cfg(unix)]
#[test]
fn test_unpack_applies_declared_mode() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let (store, stored) = store(&ModelKitFixture::simple());
    unpack(&store, &stored, &UnpackOptions::new(dir.path())).unwrap();

    let mode = fs::metadata(dir.path().join("src/util/helpers.py"))
        .unwrap()
        .permissions()
        .mode();
    assert_ne!(mode & 0o100, 0, "owner execute bit should be set");
}

#[test]
fn test_written_kitfile_reparses() {
    let dir = TempDir::new().unwrap();
    let (store, stored) = store(&ModelKitFixture::simple());
    unpack(&store, &stored, &UnpackOptions::new(dir.path())).unwrap();

    let written = fs::read_to_string(dir.path().join(KITFILE_NAME)).unwrap();
    assert_eq!(Kitfile::from_yaml(&written).unwrap(), stored.config);
}

#[test]
fn test_existing_path_fails_without_writes() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("src")).unwrap();
    let (store, stored) = store(&ModelKitFixture::simple());

    let err = unpack(&store, &stored, &UnpackOptions::new(dir.path())).unwrap_err();

    assert!(matches!(err, UnpackError::PathExists { ref path } if path.ends_with("src")));
    assert_eq!(tree(dir.path()), vec![PathBuf::from("src")]);
}

#[test]
fn test_existing_kitfile_fails_without_writes() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(KITFILE_NAME), "keep me").unwrap();
    let (store, stored) = store(&ModelKitFixture::simple());

    let err = unpack(&store, &stored, &UnpackOptions::new(dir.path())).unwrap_err();

    assert!(matches!(err, UnpackError::PathExists { .. }));
    assert_eq!(tree(dir.path()), vec![PathBuf::from(KITFILE_NAME)]);
    assert_eq!(
        fs::read_to_string(dir.path().join(KITFILE_NAME)).unwrap(),
        "keep me"
    );
}

#[test]
fn test_escaping_destination_fails_before_extraction() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("a").join("b");
    let kitfile = Kitfile {
        model: Some(Model::new("model.bin")),
        code: vec![Code::new("../../etc")],
        ..Default::default()
    };
    let fixture = ModelKitFixture::new(kitfile)
        .with_layer(
            MediaType::MODEL_LAYER,
            LayerBuilder::new().file("model.bin", "w"),
        )
        .with_layer(
            MediaType::CODE_LAYER,
            LayerBuilder::new().file("etc/passwd", "x"),
        );
    let (store, stored) = store(&fixture);

    let err = unpack(&store, &stored, &UnpackOptions::new(&root)).unwrap_err();

    assert!(matches!(err, UnpackError::PathEscape { ref path, .. } if path == Path::new("../../etc")));
    assert!(tree(dir.path()).is_empty());
}

#[test]
fn test_escaping_entry_is_rejected() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("out");
    let (store, stored) = store(&model_fixture(
        LayerBuilder::new().raw_name("../escaped.txt", "gotcha"),
    ));

    let err = unpack(&store, &stored, &UnpackOptions::new(&root)).unwrap_err();

    assert!(matches!(err, UnpackError::PathEscape { .. }));
    assert!(!dir.path().join("escaped.txt").exists());
}

#[test]
fn test_absolute_entry_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (store, stored) = store(&model_fixture(
        LayerBuilder::new().raw_name("/modelkit-unpack-test/escaped.txt", "gotcha"),
    ));

    let err = unpack(&store, &stored, &UnpackOptions::new(dir.path())).unwrap_err();
    assert!(matches!(err, UnpackError::PathEscape { .. }));
}

#[test]
fn test_truncated_entry_is_short_write() {
    let dir = TempDir::new().unwrap();
    let (store, stored) = store(&model_fixture(
        LayerBuilder::new().truncated_file("model.bin", 100, vec![1u8; 10]),
    ));

    let err = unpack(&store, &stored, &UnpackOptions::new(dir.path())).unwrap_err();

    assert!(matches!(
        err,
        UnpackError::ShortWrite {
            expected: 100,
            written: 10,
            ..
        }
    ));
}

#[test]
fn test_symlink_entry_is_unsupported() {
    let dir = TempDir::new().unwrap();
    let kitfile = Kitfile {
        code: vec![Code::new("src")],
        ..Default::default()
    };
    let fixture = ModelKitFixture::new(kitfile).with_layer(
        MediaType::CODE_LAYER,
        LayerBuilder::new()
            .dir("src")
            .file("src/main.py", "print()")
            .symlink("src/passwd", "/etc/passwd")
            .file("src/after.py", "never written"),
    );
    let (store, stored) = store(&fixture);

    let err = unpack(&store, &stored, &UnpackOptions::new(dir.path())).unwrap_err();

    assert!(matches!(
        err,
        UnpackError::UnsupportedEntry { ref path, ref kind }
            if path == Path::new("src/passwd") && kind.contains("Symlink")
    ));
    assert!(dir.path().join("src/main.py").exists());
    assert!(!dir.path().join("src/passwd").exists());
    assert!(!dir.path().join("src/after.py").exists());
}

#[test]
fn test_annotation_selects_entry() {
    let dir = TempDir::new().unwrap();
    let kitfile = Kitfile {
        code: vec![Code::new("src"), Code::new("scripts")],
        ..Default::default()
    };
    let fixture = ModelKitFixture::new(kitfile)
        .with_annotated_layer(
            MediaType::CODE_LAYER,
            LayerBuilder::new().file("scripts/run.sh", "run"),
            ANNOTATION_ENTRY_PATH,
            "scripts",
        )
        .with_annotated_layer(
            MediaType::CODE_LAYER,
            LayerBuilder::new().file("src/main.py", "main"),
            ANNOTATION_ENTRY_PATH,
            "src",
        );
    let (store, stored) = store(&fixture);

    let summary = unpack(&store, &stored, &UnpackOptions::new(dir.path())).unwrap();

    assert_eq!(summary.code, 2);
    assert_eq!(
        fs::read_to_string(dir.path().join("scripts/run.sh")).unwrap(),
        "run"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("src/main.py")).unwrap(),
        "main"
    );
}

#[test]
fn test_multiple_datasets_follow_layer_order() {
    let dir = TempDir::new().unwrap();
    let kitfile = Kitfile {
        datasets: vec![
            DataSet::new("train", "data/train.csv"),
            DataSet::new("eval", "data/eval.csv"),
        ],
        ..Default::default()
    };
    let fixture = ModelKitFixture::new(kitfile)
        .with_layer(
            MediaType::DATASET_LAYER,
            LayerBuilder::new().file("train.csv", "train"),
        )
        .with_layer(
            MediaType::DATASET_LAYER,
            LayerBuilder::new().file("eval.csv", "eval"),
        );
    let (store, stored) = store(&fixture);

    let summary = unpack(&store, &stored, &UnpackOptions::new(dir.path())).unwrap();

    assert_eq!(summary.datasets, 2);
    assert_eq!(
        fs::read_to_string(dir.path().join("data/eval.csv")).unwrap(),
        "eval"
    );
}

#[test]
fn test_overwrite_replaces_files() {
    let dir = TempDir::new().unwrap();
    let (store, stored) = store(&ModelKitFixture::simple());
    let options = UnpackOptions::new(dir.path());

    unpack(&store, &stored, &options).unwrap();
    fs::write(dir.path().join("model.bin"), "stale").unwrap();

    assert!(matches!(
        unpack(&store, &stored, &options),
        Err(UnpackError::PathExists { .. })
    ));
    unpack(&store, &stored, &options.clone().with_overwrite(true)).unwrap();
    assert_eq!(
        fs::read_to_string(dir.path().join("model.bin")).unwrap(),
        "model weights"
    );
}

#[test]
fn test_overwrite_never_replaces_file_with_directory() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("src"), "a file").unwrap();
    let (store, stored) = store(&ModelKitFixture::simple());

    let options = UnpackOptions::new(dir.path()).with_overwrite(true);
    let err = unpack(&store, &stored, &options).unwrap_err();

    assert!(matches!(
        err,
        UnpackError::PathTypeConflict {
            expected: PathKind::Directory,
            ..
        }
    ));
    assert_eq!(
        fs::read_to_string(dir.path().join("src")).unwrap(),
        "a file"
    );
}

#[test]
fn test_missing_directory_entry_still_detects_file_conflict() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("src"), "a file").unwrap();
    let kitfile = Kitfile {
        code: vec![Code::new("src")],
        ..Default::default()
    };
    let fixture = ModelKitFixture::new(kitfile).with_layer(
        MediaType::CODE_LAYER,
        LayerBuilder::new().file("src/main.py", "print()"),
    );
    let (store, stored) = store(&fixture);

    let options = UnpackOptions::new(dir.path()).with_overwrite(true);
    let err = unpack(&store, &stored, &options).unwrap_err();

    assert!(matches!(
        err,
        UnpackError::PathTypeConflict {
            ref path,
            expected: PathKind::Directory,
        } if path == &dir.path().join("src")
    ));
    assert_eq!(
        fs::read_to_string(dir.path().join("src")).unwrap(),
        "a file"
    );
}

#[cfg(unix)]
#[test]
fn test_symlinked_destination_parent_is_rejected() {
    let dir = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    std::os::unix::fs::symlink(outside.path(), dir.path().join("data")).unwrap();
    let (store, stored) = store(&ModelKitFixture::simple());

    let err = unpack(&store, &stored, &UnpackOptions::new(dir.path())).unwrap_err();

    assert!(matches!(err, UnpackError::PathEscape { .. }));
    assert!(tree(outside.path()).is_empty());
    assert_eq!(tree(dir.path()), vec![PathBuf::from("data")]);
}

#[cfg(unix)]
#[test]
fn test_symlinked_directory_inside_layer_is_rejected() {
    let dir = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("src")).unwrap();
    std::os::unix::fs::symlink(outside.path(), dir.path().join("src/util")).unwrap();

    let kitfile = Kitfile {
        code: vec![Code::new("src")],
        ..Default::default()
    };
    let fixture = ModelKitFixture::new(kitfile).with_layer(
        MediaType::CODE_LAYER,
        LayerBuilder::new()
            .file("src/main.py", "print()")
            .file("src/util/helpers.py", "escaped"),
    );
    let (store, stored) = store(&fixture);

    let options = UnpackOptions::new(dir.path()).with_overwrite(true);
    let err = unpack(&store, &stored, &options).unwrap_err();

    assert!(matches!(err, UnpackError::PathEscape { ref path, .. } if path.ends_with("src/util/helpers.py")));
    assert!(tree(outside.path()).is_empty());
}

#[test]
fn test_filter_limits_output() {
    let dir = TempDir::new().unwrap();
    let (store, stored) = store(&ModelKitFixture::simple());

    let options = UnpackOptions::new(dir.path()).with_filter(UnpackFilter::parse("model").unwrap());
    let summary = unpack(&store, &stored, &options).unwrap();

    assert_eq!(
        summary,
        UnpackSummary {
            model: 1,
            ..Default::default()
        }
    );
    assert_eq!(tree(dir.path()), vec![PathBuf::from("model.bin")]);
}

#[test]
fn test_unknown_layers_are_skipped() {
    let dir = TempDir::new().unwrap();
    let fixture = model_fixture(LayerBuilder::new().file("model.bin", "w")).with_layer(
        "application/vnd.example.readme.v1.tar+gzip",
        LayerBuilder::new().file("README.md", "hi"),
    );
    let (store, stored) = store(&fixture);

    let summary = unpack(&store, &stored, &UnpackOptions::new(dir.path())).unwrap();

    assert_eq!(summary.model, 1);
    assert!(!dir.path().join("README.md").exists());
}

#[test]
fn test_cancelled_before_start_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("out");
    let (store, stored) = store(&ModelKitFixture::simple());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = unpack_modelkit(
        &store,
        &stored.manifest,
        &stored.config,
        &UnpackOptions::new(&root),
        &cancel,
    )
    .unwrap_err();

    assert!(err.is_cancelled());
    assert!(!root.exists());
}

/// Cancels the token when a chosen blob is fetched.
struct CancelOnFetch {
    inner: MemoryStore,
    digest: String,
    cancel: CancellationToken,
}

impl ContentStore for CancelOnFetch {
    fn fetch(&self, descriptor: &Descriptor) -> Result<Box<dyn Read + Send + '_>, StoreError> {
        if descriptor.digest == self.digest {
            self.cancel.cancel();
        }
        self.inner.fetch(descriptor)
    }

    fn resolve(&self, reference: &str) -> Result<Descriptor, StoreError> {
        self.inner.resolve(reference)
    }
}

#[test]
fn test_cancelled_mid_unpack_keeps_earlier_layers() {
    let dir = TempDir::new().unwrap();
    let (inner, stored) = store(&ModelKitFixture::simple());
    let cancel = CancellationToken::new();
    let store = CancelOnFetch {
        inner,
        digest: stored.manifest.layers[1].digest.clone(),
        cancel: cancel.clone(),
    };

    let err = unpack_modelkit(
        &store,
        &stored.manifest,
        &stored.config,
        &UnpackOptions::new(dir.path()),
        &cancel,
    )
    .unwrap_err();

    assert!(matches!(err, UnpackError::Cancelled));
    assert!(dir.path().join("model.bin").exists());
    assert!(!dir.path().join("src/main.py").exists());
    assert!(!dir.path().join("data").exists());
}

/// Fails every blob stream after `limit` bytes.
struct FailAfter {
    inner: MemoryStore,
    limit: usize,
}

impl ContentStore for FailAfter {
    fn fetch(&self, descriptor: &Descriptor) -> Result<Box<dyn Read + Send + '_>, StoreError> {
        let stream = self
            .inner
            .fetch(descriptor)?
            .take(self.limit as u64)
            .chain(FailingReader);
        Ok(Box::new(stream))
    }

    fn resolve(&self, reference: &str) -> Result<Descriptor, StoreError> {
        self.inner.resolve(reference)
    }
}

struct FailingReader;

impl Read for FailingReader {
    fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::Error::other("connection reset"))
    }
}

#[test]
fn test_stream_failure_during_file_is_archive_error() {
    let dir = TempDir::new().unwrap();
    // Poorly compressible content so the failure lands inside the file data.
    let mut state = 0x2545_f491_u32;
    let weights: Vec<u8> = (0..256 * 1024)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state.to_le_bytes()[0]
        })
        .collect();
    let (inner, stored) = store(&model_fixture(
        LayerBuilder::new().file("model.bin", weights),
    ));
    let layer = &stored.manifest.layers[0];
    let store = FailAfter {
        inner,
        limit: usize::try_from(layer.size / 2).unwrap(),
    };

    let err = unpack_modelkit(
        &store,
        &stored.manifest,
        &stored.config,
        &UnpackOptions::new(dir.path()),
        &CancellationToken::new(),
    )
    .unwrap_err();

    assert!(
        matches!(err, UnpackError::Archive { ref digest, .. } if *digest == layer.digest),
        "unexpected error: {err}"
    );
}

#[test]
fn test_unpack_reference_from_layout() {
    let dir = TempDir::new().unwrap();
    let layout = dir.path().join("layout");
    let root = dir.path().join("out");
    ModelKitFixture::simple()
        .write_layout(&layout, "v1")
        .unwrap();

    let store = LocalLayoutStore::new(&layout);
    let summary = unpack_reference(
        &store,
        "v1",
        &UnpackOptions::new(&root),
        &CancellationToken::new(),
    )
    .unwrap();

    assert_eq!(summary.code, 1);
    assert!(root.join("src/util/helpers.py").exists());
}

#[test]
fn test_unpack_reference_detects_tampered_layer() {
    let dir = TempDir::new().unwrap();
    let layout = dir.path().join("layout");
    let stored = ModelKitFixture::simple()
        .write_layout(&layout, "v1")
        .unwrap();

    let store = LocalLayoutStore::new(&layout);
    let blob = store.blob_path(&stored.manifest.layers[0].digest).unwrap();
    let mut data = fs::read(&blob).unwrap();
    data.push(0);
    fs::write(&blob, data).unwrap();

    let err = unpack_reference(
        &store,
        "v1",
        &UnpackOptions::new(dir.path().join("out")),
        &CancellationToken::new(),
    )
    .unwrap_err();

    assert!(
        matches!(err, UnpackError::Archive { ref digest, .. } if *digest == stored.manifest.layers[0].digest),
        "unexpected error: {err}"
    );
}

#[test]
fn test_unpack_reference_unknown_tag() {
    let dir = TempDir::new().unwrap();
    let (store, _) = store(&ModelKitFixture::simple());

    let err = unpack_reference(
        &store,
        "missing",
        &UnpackOptions::new(dir.path()),
        &CancellationToken::new(),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        UnpackError::Registry(RegistryError::NotFound { .. })
    ));
}
