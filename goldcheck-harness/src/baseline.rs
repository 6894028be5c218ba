//! Baseline storage.
//!
//! The expected artifact of `<dir>/<name>.kt` lives beside it as
//! `<dir>/<name>.txt`. Only regeneration writes baselines.

use std::path::{Path, PathBuf};

use goldcheck_fs::{Filesystem, FsError};
use goldcheck_schema::{Artifact, Fixture};
use thiserror::Error;

/// Errors from baseline access.
#[derive(Debug, Error)]
pub enum BaselineError {
    /// No baseline recorded yet. A regular outcome, not a crash.
    #[error("baseline not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("failed to read baseline {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("failed to write baseline {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: FsError,
    },
}

/// What a store call did to the baseline file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Loads and stores expected artifacts under a test-data root.
#[derive(Debug)]
pub struct BaselineStore<F: Filesystem> {
    fs: F,
    root: PathBuf,
    extension: String,
}

impl<F: Filesystem> BaselineStore<F> {
    pub fn new(fs: F, root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            fs,
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    /// Absolute path of the fixture source.
    pub fn fixture_path(&self, fixture: &Fixture) -> PathBuf {
        join_relative(&self.root, &fixture.relative_path)
    }

    /// Baseline path relative to the root, `/`-separated.
    pub fn expected_relative_path(&self, fixture: &Fixture) -> String {
        let path = &fixture.relative_path;
        let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
        match path[name_start..].rfind('.') {
            Some(dot) if dot > 0 => format!("{}.{}", &path[..name_start + dot], self.extension),
            _ => format!("{}.{}", path, self.extension),
        }
    }

    /// Absolute baseline path.
    pub fn expected_path(&self, fixture: &Fixture) -> PathBuf {
        join_relative(&self.root, &self.expected_relative_path(fixture))
    }

    /// Load the recorded expected artifact.
    pub fn load(&self, fixture: &Fixture) -> Result<Artifact, BaselineError> {
        let path = self.expected_path(fixture);
        match self.fs.read_file(&path) {
            Ok(text) => Ok(Artifact::from(text)),
            Err(e) if e.is_not_found() => Err(BaselineError::Missing(path)),
            Err(e) => Err(BaselineError::Read { path, source: e }),
        }
    }

    /// Overwrite the baseline with `artifact`.
    pub fn store(&self, fixture: &Fixture, artifact: &Artifact) -> Result<StoreOutcome, BaselineError> {
        let path = self.expected_path(fixture);
        let outcome = match self.fs.read_file(&path) {
            Ok(previous) if previous == artifact.as_str() => StoreOutcome::Unchanged,
            Ok(_) => StoreOutcome::Updated,
            Err(e) if e.is_not_found() => StoreOutcome::Created,
            // Unreadable but present; the write below decides whether it is usable.
            Err(_) => StoreOutcome::Updated,
        };

        self.fs
            .write_atomic(&path, artifact.as_str().as_bytes())
            .map_err(|e| BaselineError::Write { path, source: e })?;
        Ok(outcome)
    }
}

fn join_relative(root: &Path, relative: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    path.extend(relative.split('/').filter(|s| !s.is_empty()));
    path
}
