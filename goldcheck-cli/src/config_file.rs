//! JSON config file (`goldcheck.json`).
//!
//! Every field is optional. Relative paths resolve against the directory
//! holding the config file, so a checked-in config works from any cwd.

use std::path::{Path, PathBuf};

use goldcheck_fs::{Filesystem, FsError};
use serde::Deserialize;
use thiserror::Error;

/// Errors loading a config file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// External producer command as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProducerConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

/// Contents of a config file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub root: Option<PathBuf>,
    pub pattern: Option<String>,
    pub recursive: Option<bool>,
    #[serde(default)]
    pub excludes: Vec<String>,
    pub baseline_extension: Option<String>,
    pub id_prefix: Option<String>,
    pub jobs: Option<usize>,
    pub timeout_sec: Option<u64>,
    pub reverse_check: Option<bool>,
    pub registry: Option<PathBuf>,
    pub producer: Option<ProducerConfig>,
}

impl ConfigFile {
    /// Parse JSON and resolve relative paths against `base_dir`.
    pub fn from_json(json: &str, base_dir: &Path) -> Result<Self, serde_json::Error> {
        let mut file: ConfigFile = serde_json::from_str(json)?;
        file.resolve_paths(base_dir);
        Ok(file)
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base_dir.join(&*p);
            }
        };
        if let Some(root) = &mut self.root {
            resolve(root);
        }
        if let Some(registry) = &mut self.registry {
            resolve(registry);
        }
        if let Some(producer) = &mut self.producer {
            if let Some(dir) = &mut producer.working_dir {
                resolve(dir);
            }
            // Bare names are looked up on PATH; only explicit paths are anchored.
            let program = Path::new(&producer.program);
            if program.is_relative() && program.components().count() > 1 {
                producer.program = base_dir.join(program).to_string_lossy().into_owned();
            }
        }
    }
}

/// Read and parse a config file.
pub fn load_config_file<F: Filesystem>(fs: &F, path: &Path) -> Result<ConfigFile, ConfigFileError> {
    let json = fs.read_file(path).map_err(|e| ConfigFileError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    ConfigFile::from_json(&json, base_dir).map_err(|e| ConfigFileError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}
