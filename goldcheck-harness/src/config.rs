//! Harness configuration.

use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;

use crate::discovery::{DiscoveryConfig, DiscoveryError};

/// Default fixture file-name pattern. The first capture group is the base name.
pub const DEFAULT_PATTERN: &str = r"^(.+)\.kt$";

/// Default extension of the sibling baseline file.
pub const DEFAULT_BASELINE_EXTENSION: &str = "txt";

/// Default prefix of derived identifiers.
pub const DEFAULT_ID_PREFIX: &str = "test";

/// Default number of worker threads.
pub const DEFAULT_JOBS: usize = 4;

/// Errors from configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("jobs must be at least 1, got {0}")]
    InvalidJobs(usize),

    #[error("timeout must be at least 1 second, got {0}")]
    InvalidTimeout(u64),

    #[error("invalid fixture pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid exclude pattern: {0}")]
    InvalidExclude(String),

    #[error("baseline extension must be a plain extension without dots or separators, got `{0}`")]
    InvalidBaselineExtension(String),

    #[error("baseline files `*.{0}` would themselves match the fixture pattern")]
    BaselineMatchesPattern(String),

    #[error("identifier prefix may only contain ASCII letters, digits and `_`, got `{0}`")]
    InvalidIdPrefix(String),
}

/// Harness configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Test-data root containing fixtures and baselines.
    pub root: PathBuf,
    /// Regex matched against fixture file names.
    pub pattern: String,
    /// Descend into subdirectories of `root`.
    pub recursive: bool,
    /// Glob patterns (relative to `root`) of fixtures to skip.
    pub excludes: Vec<String>,
    pub baseline_extension: String,
    pub id_prefix: String,
    pub jobs: usize,
    /// Suite deadline; fixtures not started in time are reported as not run.
    pub timeout_sec: Option<u64>,
    /// Also report registry entries with no fixture on disk.
    pub reverse_check: bool,
    /// Ignore, and for regeneration replace, a lock left by another run.
    pub force_unlock: bool,
}

impl HarnessConfig {
    /// Create a config with defaults for the given root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pattern: DEFAULT_PATTERN.to_string(),
            recursive: true,
            excludes: Vec::new(),
            baseline_extension: DEFAULT_BASELINE_EXTENSION.to_string(),
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
            jobs: DEFAULT_JOBS,
            timeout_sec: None,
            reverse_check: false,
            force_unlock: false,
        }
    }

    /// Builder: set the fixture pattern.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Builder: set recursion.
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Builder: set exclude globs.
    pub fn with_excludes(mut self, excludes: Vec<String>) -> Self {
        self.excludes = excludes;
        self
    }

    /// Builder: set the baseline extension.
    pub fn with_baseline_extension(mut self, extension: impl Into<String>) -> Self {
        self.baseline_extension = extension.into();
        self
    }

    /// Builder: set the identifier prefix.
    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    /// Builder: set the worker count.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Builder: set the suite timeout.
    pub fn with_timeout_sec(mut self, timeout_sec: Option<u64>) -> Self {
        self.timeout_sec = timeout_sec;
        self
    }

    /// Builder: enable reverse completeness checking.
    pub fn with_reverse_check(mut self, reverse_check: bool) -> Self {
        self.reverse_check = reverse_check;
        self
    }

    /// Builder: override a stale regeneration lock.
    pub fn with_force_unlock(mut self, force_unlock: bool) -> Self {
        self.force_unlock = force_unlock;
        self
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs == 0 {
            return Err(ConfigError::InvalidJobs(self.jobs));
        }
        if self.timeout_sec == Some(0) {
            return Err(ConfigError::InvalidTimeout(0));
        }

        let ext = &self.baseline_extension;
        if ext.is_empty() || ext.contains(['.', '/', '\\']) {
            return Err(ConfigError::InvalidBaselineExtension(ext.clone()));
        }

        if !self
            .id_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::InvalidIdPrefix(self.id_prefix.clone()));
        }

        let regex = Regex::new(&self.pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: self.pattern.clone(),
            source: e,
        })?;
        if regex.is_match(&format!("fixture.{}", ext)) {
            return Err(ConfigError::BaselineMatchesPattern(ext.clone()));
        }

        for exclude in &self.excludes {
            glob::Pattern::new(exclude).map_err(|_| ConfigError::InvalidExclude(exclude.clone()))?;
        }

        Ok(())
    }

    /// Build the discovery settings for this config.
    pub fn discovery_config(&self) -> Result<DiscoveryConfig, DiscoveryError> {
        Ok(DiscoveryConfig::new(&self.root, &self.pattern)?
            .with_recursive(self.recursive)
            .with_excludes(&self.excludes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::new("/data");
        assert_eq!(config.root(), Path::new("/data"));
        assert_eq!(config.pattern, DEFAULT_PATTERN);
        assert!(config.recursive);
        assert_eq!(config.baseline_extension, "txt");
        assert_eq!(config.id_prefix, "test");
        assert_eq!(config.jobs, DEFAULT_JOBS);
        assert_eq!(config.timeout_sec, None);
        assert!(!config.reverse_check);
        assert!(!config.force_unlock);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = HarnessConfig::new("/data")
            .with_pattern(r"^(.+)\.java$")
            .with_recursive(false)
            .with_excludes(vec!["skip/**".into()])
            .with_baseline_extension("out")
            .with_id_prefix("")
            .with_jobs(2)
            .with_timeout_sec(Some(60))
            .with_reverse_check(true)
            .with_force_unlock(true);

        assert_eq!(config.pattern, r"^(.+)\.java$");
        assert!(!config.recursive);
        assert_eq!(config.excludes, vec!["skip/**".to_string()]);
        assert_eq!(config.baseline_extension, "out");
        assert_eq!(config.jobs, 2);
        assert_eq!(config.timeout_sec, Some(60));
        assert!(config.reverse_check);
        assert!(config.force_unlock);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_jobs() {
        let err = HarnessConfig::new("/d").with_jobs(0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidJobs(0)));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let err = HarnessConfig::new("/d")
            .with_timeout_sec(Some(0))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeout(0)));
    }

    #[test]
    fn test_validate_rejects_bad_pattern() {
        let err = HarnessConfig::new("/d")
            .with_pattern("(unclosed")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_extension() {
        for ext in ["", ".txt", "a/b", "tar.gz"] {
            let err = HarnessConfig::new("/d")
                .with_baseline_extension(ext)
                .validate()
                .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidBaselineExtension(_)), "{ext}");
        }
    }

    #[test]
    fn test_validate_rejects_baseline_matching_pattern() {
        let err = HarnessConfig::new("/d")
            .with_baseline_extension("kt")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::BaselineMatchesPattern(_)));
    }

    #[test]
    fn test_validate_rejects_bad_prefix() {
        let err = HarnessConfig::new("/d")
            .with_id_prefix("test-")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidIdPrefix(_)));
    }

    #[test]
    fn test_validate_rejects_bad_exclude() {
        let err = HarnessConfig::new("/d")
            .with_excludes(vec!["[".into()])
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidExclude(_)));
    }

    #[test]
    fn test_discovery_config_carries_settings() {
        let config = HarnessConfig::new("/d").with_recursive(false);
        let discovery = config.discovery_config().unwrap();
        assert_eq!(discovery.root, PathBuf::from("/d"));
        assert!(!discovery.recursive);
    }
}
