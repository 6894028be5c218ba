//! Fixture and registry records.

use serde::{Deserialize, Serialize};

/// Current registry file version.
pub const REGISTRY_VERSION: u32 = 1;

/// A discovered test-case fixture.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fixture {
    /// Path under the test-data root, always `/`-separated.
    pub relative_path: String,
    /// Canonical test identifier derived from `relative_path`.
    pub derived_id: String,
}

impl Fixture {
    pub fn new(relative_path: impl Into<String>, derived_id: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            derived_id: derived_id.into(),
        }
    }
}

/// A generated record asserting that `id` is the registered check for `fixture`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub id: String,
    /// Fixture path relative to the test-data root.
    pub fixture: String,
}

impl RegistryEntry {
    pub fn new(id: impl Into<String>, fixture: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fixture: fixture.into(),
        }
    }
}

/// On-disk registry format produced by the offline generation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryFile {
    pub version: u32,
    pub entries: Vec<RegistryEntry>,
}

impl RegistryFile {
    /// Create a registry file with the current version, entries sorted by id.
    pub fn new(mut entries: Vec<RegistryEntry>) -> Self {
        entries.sort();
        Self {
            version: REGISTRY_VERSION,
            entries,
        }
    }

    /// Serialize to pretty JSON with a trailing newline.
    pub fn to_json(&self) -> String {
        // Only strings and integers; serialization cannot fail.
        let mut json = serde_json::to_string_pretty(self).unwrap_or_default();
        json.push('\n');
        json
    }

    /// Deserialize from JSON, rejecting unknown versions.
    pub fn from_json(json: &str) -> Result<Self, RegistryFileError> {
        let file: RegistryFile = serde_json::from_str(json)?;
        if file.version != REGISTRY_VERSION {
            return Err(RegistryFileError::VersionMismatch {
                expected: REGISTRY_VERSION,
                found: file.version,
            });
        }
        Ok(file)
    }
}

/// Errors that can occur when parsing a registry file.
#[derive(Debug, thiserror::Error)]
pub enum RegistryFileError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("registry version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}
