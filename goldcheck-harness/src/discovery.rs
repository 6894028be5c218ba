//! Fixture discovery.
//!
//! Walks the test-data root and returns every file whose name matches the
//! fixture pattern, sorted by relative path.

use std::path::{Component, Path, PathBuf};

use glob::Pattern;
use goldcheck_fs::{Filesystem, FsError};
use regex::Regex;

/// Errors that can occur while scanning for fixtures.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("fixture root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("fixture root is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("invalid fixture pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid exclude pattern: {0}")]
    InvalidExclude(String),

    #[error("fixture path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
}

/// Settings for one discovery scan.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub root: PathBuf,
    pub pattern: Regex,
    pub recursive: bool,
    pub excludes: Vec<Pattern>,
}

impl DiscoveryConfig {
    /// Create a recursive scan of `root` for files matching `pattern`.
    pub fn new(root: impl Into<PathBuf>, pattern: &str) -> Result<Self, DiscoveryError> {
        let regex = Regex::new(pattern).map_err(|e| DiscoveryError::InvalidPattern {
            pattern: pattern.to_string(),
            source: e,
        })?;
        Ok(Self {
            root: root.into(),
            pattern: regex,
            recursive: true,
            excludes: Vec::new(),
        })
    }

    /// Builder: set recursion.
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Builder: set exclude globs, matched against the relative path.
    pub fn with_excludes(mut self, excludes: &[String]) -> Result<Self, DiscoveryError> {
        self.excludes = excludes
            .iter()
            .map(|p| Pattern::new(p).map_err(|_| DiscoveryError::InvalidExclude(p.clone())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self)
    }
}

/// A fixture file found on disk, before identifier derivation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DiscoveredFile {
    /// `/`-separated path relative to the root.
    pub relative_path: String,
    /// `relative_path` with the fixture extension removed.
    pub base_path: String,
}

/// Scan the root for fixtures.
pub fn discover<F: Filesystem>(
    fs: &F,
    config: &DiscoveryConfig,
) -> Result<Vec<DiscoveredFile>, DiscoveryError> {
    let root = &config.root;
    if !fs.exists(root) {
        return Err(DiscoveryError::RootNotFound(root.clone()));
    }
    if !fs.is_dir(root) {
        return Err(DiscoveryError::NotADirectory(root.clone()));
    }

    let paths = fs
        .list_files(root, config.recursive)
        .map_err(|e| DiscoveryError::Read {
            path: root.clone(),
            source: e,
        })?;

    let mut files = Vec::new();
    for path in paths {
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let file_name = file_name
            .to_str()
            .ok_or_else(|| DiscoveryError::NonUtf8Path(path.clone()))?;

        let Some(base_name) = base_name(&config.pattern, file_name) else {
            continue;
        };

        let relative_path = relative_path(root, &path)?;
        if config.excludes.iter().any(|p| p.matches(&relative_path)) {
            continue;
        }

        let base_path = match relative_path.rfind('/') {
            Some(idx) => format!("{}/{}", &relative_path[..idx], base_name),
            None => base_name,
        };

        files.push(DiscoveredFile {
            relative_path,
            base_path,
        });
    }

    files.sort();
    Ok(files)
}

/// Base name of a matching file: the first capture group, or the file stem.
fn base_name(pattern: &Regex, file_name: &str) -> Option<String> {
    let captures = pattern.captures(file_name)?;
    match captures.get(1) {
        Some(group) => Some(group.as_str().to_string()),
        None => Some(match file_name.rfind('.') {
            Some(idx) if idx > 0 => file_name[..idx].to_string(),
            _ => file_name.to_string(),
        }),
    }
}

/// Relative path joined with `/` regardless of platform.
fn relative_path(root: &Path, path: &Path) -> Result<String, DiscoveryError> {
    let rest = path
        .strip_prefix(root)
        .map_err(|_| DiscoveryError::NonUtf8Path(path.to_path_buf()))?;

    let mut segments = Vec::new();
    for component in rest.components() {
        if let Component::Normal(segment) = component {
            let segment = segment
                .to_str()
                .ok_or_else(|| DiscoveryError::NonUtf8Path(path.to_path_buf()))?;
            segments.push(segment);
        }
    }
    Ok(segments.join("/"))
}
