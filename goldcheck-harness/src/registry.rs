//! Registry loading and completeness cross-checking.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use goldcheck_fs::{Filesystem, FsError};
use goldcheck_schema::{
    CompletenessResult, Fixture, RegistryEntry, RegistryFile, RegistryFileError,
    UnregisteredFixture, UnregisteredReason,
};
use thiserror::Error;

/// Errors from loading a registry file.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read registry {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("invalid registry {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: RegistryFileError,
    },

    #[error("registry lists id `{0}` more than once")]
    DuplicateId(String),
}

/// The statically generated list of registered checks, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    by_id: BTreeMap<String, String>,
}

impl Registry {
    pub fn from_entries(entries: Vec<RegistryEntry>) -> Result<Self, RegistryError> {
        let mut by_id = BTreeMap::new();
        for entry in entries {
            if by_id.insert(entry.id.clone(), entry.fixture).is_some() {
                return Err(RegistryError::DuplicateId(entry.id));
            }
        }
        Ok(Self { by_id })
    }

    /// Fixture path registered under `id`.
    pub fn get(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Entries sorted by id.
    pub fn entries(&self) -> Vec<RegistryEntry> {
        self.by_id
            .iter()
            .map(|(id, fixture)| RegistryEntry::new(id.as_str(), fixture.as_str()))
            .collect()
    }
}

/// Load and parse a registry file.
pub fn load_registry<F: Filesystem>(fs: &F, path: &Path) -> Result<Registry, RegistryError> {
    let json = fs.read_file(path).map_err(|e| RegistryError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let file = RegistryFile::from_json(&json).map_err(|e| RegistryError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    Registry::from_entries(file.entries)
}

/// Compare discovered fixtures against the registry.
///
/// Orphans (entries with no fixture on disk) are only collected when
/// `reverse` is set.
pub fn cross_check(fixtures: &[Fixture], registry: &Registry, reverse: bool) -> CompletenessResult {
    let mut unregistered = Vec::new();
    for fixture in fixtures {
        let reason = match registry.get(&fixture.derived_id) {
            Some(path) if path == fixture.relative_path => continue,
            Some(path) => UnregisteredReason::PathMismatch {
                registered: path.to_string(),
            },
            None => UnregisteredReason::NoEntry,
        };
        unregistered.push(UnregisteredFixture {
            fixture: fixture.clone(),
            reason,
        });
    }

    let mut orphans = Vec::new();
    if reverse {
        let on_disk: BTreeSet<(&str, &str)> = fixtures
            .iter()
            .map(|f| (f.derived_id.as_str(), f.relative_path.as_str()))
            .collect();
        orphans = registry
            .entries()
            .into_iter()
            .filter(|e| !on_disk.contains(&(e.id.as_str(), e.fixture.as_str())))
            .collect();
    }

    CompletenessResult {
        checked: true,
        reverse_checked: reverse,
        unregistered,
        orphans,
    }
}
