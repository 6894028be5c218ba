//! Per-root regeneration lock.
//!
//! Regeneration takes a file created exclusively in the root and removes it
//! when the guard drops. Verification never writes the root: it only refuses
//! to start while that file exists, so any number of verify runs can share a
//! root.

use std::fmt;
use std::path::{Path, PathBuf};

use goldcheck_fs::{Filesystem, FsError};

/// Name of the lock file inside the root.
pub const LOCK_FILE_NAME: &str = ".goldcheck.lock";

/// Mode token written at the start of the lock file.
const HOLDER_MODE: &str = "regenerate";

/// Who holds the lock, as recorded in the lock file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHolder {
    pub mode: String,
    pub pid: Option<u32>,
}

impl LockHolder {
    fn current() -> Self {
        Self {
            mode: HOLDER_MODE.to_string(),
            pid: Some(std::process::id()),
        }
    }

    /// Parse `"<mode> <pid>"`. A missing or garbled pid is kept as `None`.
    pub fn parse(text: &str) -> Self {
        let mut parts = text.split_whitespace();
        let mode = parts.next().unwrap_or("unknown").to_string();
        let pid = parts.next().and_then(|p| p.parse().ok());
        Self { mode, pid }
    }

    fn to_line(&self) -> String {
        match self.pid {
            Some(pid) => format!("{} {}\n", self.mode, pid),
            None => format!("{}\n", self.mode),
        }
    }
}

impl fmt::Display for LockHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pid {
            Some(pid) => write!(f, "{} (pid {})", self.mode, pid),
            None => write!(f, "{}", self.mode),
        }
    }
}

/// Errors acquiring or checking the lock.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("{} is locked by a running `{holder}`", .root.display())]
    Busy { root: PathBuf, holder: LockHolder },

    #[error("failed to access lock file: {0}")]
    Fs(#[from] FsError),
}

/// The lock file of `root`, if one exists.
pub fn current_holder<F: Filesystem>(fs: &F, root: &Path) -> Result<Option<LockHolder>, FsError> {
    match fs.read_file(&root.join(LOCK_FILE_NAME)) {
        Ok(text) => Ok(Some(LockHolder::parse(&text))),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Fail with [`LockError::Busy`] while a regeneration holds `root`.
///
/// Reads only. With `force` an existing lock is returned instead of
/// rejected so the caller can report it.
pub fn ensure_not_regenerating<F: Filesystem>(
    fs: &F,
    root: &Path,
    force: bool,
) -> Result<Option<LockHolder>, LockError> {
    match current_holder(fs, root)? {
        Some(holder) if !force => Err(LockError::Busy {
            root: root.to_path_buf(),
            holder,
        }),
        other => Ok(other),
    }
}

/// Held for the duration of a regeneration.
#[derive(Debug)]
pub struct RunLock<'a, F: Filesystem> {
    fs: &'a F,
    path: PathBuf,
}

impl<'a, F: Filesystem> RunLock<'a, F> {
    /// Create the lock file with this process id.
    ///
    /// With `force` a lock left behind by a dead run is removed first.
    pub fn acquire(fs: &'a F, root: &Path, force: bool) -> Result<Self, LockError> {
        let path = root.join(LOCK_FILE_NAME);
        if force {
            match fs.remove(&path) {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(LockError::Fs(e)),
            }
        }

        let line = LockHolder::current().to_line();
        match fs.create_exclusive(&path, line.as_bytes()) {
            Ok(()) => Ok(Self { fs, path }),
            Err(FsError::AlreadyExists(_)) => {
                let holder = fs
                    .read_file(&path)
                    .map(|s| LockHolder::parse(&s))
                    .unwrap_or_else(|_| LockHolder::parse(""));
                Err(LockError::Busy {
                    root: root.to_path_buf(),
                    holder,
                })
            }
            Err(e) => Err(LockError::Fs(e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<F: Filesystem> Drop for RunLock<'_, F> {
    fn drop(&mut self) {
        let _ = self.fs.remove(&self.path);
    }
}
