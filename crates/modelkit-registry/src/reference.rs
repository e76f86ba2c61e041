//! ModelKit reference parsing.
//!
//! Parses references like `registry.example.com/org/repo:v1,latest` into a
//! canonical [`Reference`] plus any extra tags. References are normalised so
//! that registry and repository are always present:
//!
//! - `sha256:<hex>` → `localhost/_@sha256:<hex>`
//! - `repo` → `localhost/repo:latest`
//! - `org/repo:v1` → `localhost/org/repo:v1`
//! - `registry.io/repo:v1` → `registry.io/repo:v1`
//! - `localhost:5000/repo@sha256:<hex>` → `localhost:5000/repo@sha256:<hex>`

use std::fmt;
use std::path::{Path, PathBuf};

use modelkit_core::Digest;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::RegistryError;

/// Registry assumed when a reference does not name one.
pub const DEFAULT_REGISTRY: &str = "localhost";

/// Repository placeholder for references given as a bare digest.
pub const DEFAULT_REPOSITORY: &str = "_";

/// Tag assumed when a reference names neither a tag nor a digest.
pub const DEFAULT_TAG: &str = "latest";

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9._-]{0,127}$").expect("valid tag regex"));

static REGISTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*(?::[0-9]{1,5})?$",
    )
    .expect("valid registry regex")
});

static REPOSITORY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-z0-9]+(?:(?:[._]|__|[-]*)[a-z0-9]+)*(?:/[a-z0-9]+(?:(?:[._]|__|[-]*)[a-z0-9]+)*)*$",
    )
    .expect("valid repository regex")
});

/// A canonical ModelKit reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    /// Registry host, optionally with a port (e.g. `localhost`, `ghcr.io:443`).
    pub registry: String,
    /// Repository path (e.g. `org/repo`).
    pub repository: String,
    /// Tag or digest.
    pub reference: String,
}

impl Reference {
    /// Returns the reference used when none is supplied: the default
    /// registry and repository placeholder, tagged `latest`.
    #[must_use]
    pub fn default_reference() -> Self {
        Self {
            registry: DEFAULT_REGISTRY.to_string(),
            repository: DEFAULT_REPOSITORY.to_string(),
            reference: DEFAULT_TAG.to_string(),
        }
    }

    /// Returns true if the reference part is a digest rather than a tag.
    #[must_use]
    pub fn is_digest(&self) -> bool {
        Digest::is_valid(&self.reference)
    }

    /// Returns the tag, if the reference part is a tag.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        (!self.is_digest()).then_some(self.reference.as_str())
    }

    /// Returns the digest, if the reference part is a digest.
    #[must_use]
    pub fn digest(&self) -> Option<&str> {
        self.is_digest().then_some(self.reference.as_str())
    }

    /// Returns `registry/repository`.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{}/{}", self.registry, self.repository)
    }

    /// Returns the directory holding the local OCI layout for this
    /// reference's repository under `storage_root`.
    #[must_use]
    pub fn repo_path(&self, storage_root: &Path) -> PathBuf {
        storage_root.join(&self.registry).join(&self.repository)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = if self.is_digest() { '@' } else { ':' };
        write!(f, "{}/{}{sep}{}", self.registry, self.repository, self.reference)
    }
}

/// Parses a reference string into a [`Reference`] and any extra tags.
///
/// A bare digest yields the default registry and repository placeholder.
/// Otherwise, when the first `/`-separated segment does not look like a
/// registry host (see [`looks_like_registry_host`]) the default registry is
/// prepended, so `org/repo` becomes `localhost/org/repo`. Text after the
/// first `,` is returned as extra tags; they are not validated here.
///
/// # Errors
///
/// Returns [`RegistryError::InvalidReference`] if the primary reference does
/// not follow the `registry/repository[:tag][@digest]` grammar.
///
/// # Examples
///
/// ```
/// use modelkit_registry::parse_reference;
///
/// let (r, extra) = parse_reference("registry.example.com/org/repo:v1,latest,stable").unwrap();
/// assert_eq!(r.registry, "registry.example.com");
/// assert_eq!(r.repository, "org/repo");
/// assert_eq!(r.reference, "v1");
/// assert_eq!(extra, vec!["latest", "stable"]);
/// ```
pub fn parse_reference(input: &str) -> Result<(Reference, Vec<String>), RegistryError> {
    if Digest::is_valid(input) {
        let reference = Reference {
            registry: DEFAULT_REGISTRY.to_string(),
            repository: DEFAULT_REPOSITORY.to_string(),
            reference: input.to_string(),
        };
        return Ok((reference, Vec::new()));
    }

    let qualified = match input.split_once('/') {
        Some((first, _)) if looks_like_registry_host(first) => input.to_string(),
        _ => format!("{DEFAULT_REGISTRY}/{input}"),
    };

    let mut pieces = qualified.split(',');
    let primary = pieces.next().unwrap_or_default();
    let extra_tags = pieces.map(str::to_string).collect();

    let reference = parse_qualified(primary).map_err(|reason| RegistryError::InvalidReference {
        reference: input.to_string(),
        reason,
    })?;
    tracing::trace!(input, %reference, "Parsed reference");
    Ok((reference, extra_tags))
}

/// Returns true if a reference's first path segment names a registry host.
///
/// This is a heuristic: a segment containing `.` or `:` (a domain or a port)
/// or equal to [`DEFAULT_REGISTRY`] is a host; anything else is taken to be
/// the first component of a repository. A repository segment that contains a
/// dot is therefore misread as a host.
///
/// # Examples
///
/// ```
/// use modelkit_registry::looks_like_registry_host;
///
/// assert!(looks_like_registry_host("registry.io"));
/// assert!(looks_like_registry_host("localhost:5000"));
/// assert!(looks_like_registry_host("localhost"));
/// assert!(!looks_like_registry_host("myorg"));
/// ```
#[must_use]
pub fn looks_like_registry_host(segment: &str) -> bool {
    segment.contains('.') || segment.contains(':') || segment == DEFAULT_REGISTRY
}

/// Validates a tag against `^[A-Za-z0-9_][A-Za-z0-9._-]{0,127}$`.
///
/// # Errors
///
/// Returns [`RegistryError::InvalidTag`] if the tag does not match.
pub fn validate_tag(tag: &str) -> Result<(), RegistryError> {
    if TAG_RE.is_match(tag) {
        Ok(())
    } else {
        Err(RegistryError::InvalidTag {
            tag: tag.to_string(),
        })
    }
}

/// Removes the default registry and repository placeholder from a
/// repository string for display.
///
/// This is cosmetic and lossy: a repository literally named like a
/// placeholder cannot be told apart afterwards.
///
/// # Examples
///
/// ```
/// use modelkit_registry::format_repository_for_display;
///
/// assert_eq!(format_repository_for_display("localhost/org/repo"), "org/repo");
/// assert_eq!(format_repository_for_display("_"), "");
/// assert_eq!(format_repository_for_display("ghcr.io/org/repo"), "ghcr.io/org/repo");
/// ```
#[must_use]
pub fn format_repository_for_display(repository: &str) -> String {
    let repository = repository
        .strip_prefix(&format!("{DEFAULT_REGISTRY}/"))
        .unwrap_or(repository);
    repository
        .strip_prefix(DEFAULT_REPOSITORY)
        .unwrap_or(repository)
        .to_string()
}

/// Parses `registry/repository[:tag][@digest]`.
fn parse_qualified(input: &str) -> Result<Reference, String> {
    let (registry, rest) = input
        .split_once('/')
        .ok_or_else(|| "missing repository".to_string())?;
    if !REGISTRY_RE.is_match(registry) {
        return Err(format!("invalid registry '{registry}'"));
    }

    let (name_tag, digest) = match rest.split_once('@') {
        Some((name_tag, digest)) => {
            Digest::parse(digest).map_err(|e| e.to_string())?;
            (name_tag, Some(digest))
        }
        None => (rest, None),
    };

    let (repository, tag) = match name_tag.split_once(':') {
        Some((repository, tag)) => {
            if !TAG_RE.is_match(tag) {
                return Err(format!("invalid tag '{tag}'"));
            }
            (repository, Some(tag))
        }
        None => (name_tag, None),
    };
    if !REPOSITORY_RE.is_match(repository) {
        return Err(format!("invalid repository '{repository}'"));
    }

    // A digest pins content, so it takes precedence over a tag given alongside it.
    let reference = digest.or(tag).unwrap_or(DEFAULT_TAG);

    Ok(Reference {
        registry: registry.to_string(),
        repository: repository.to_string(),
        reference: reference.to_string(),
    })
}
