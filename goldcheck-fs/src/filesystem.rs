//! Filesystem trait and implementations.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use thiserror::Error;

/// Errors from filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("path error: {0}")]
    Path(String),
}

impl FsError {
    /// True when the error means the path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

/// Trait for filesystem operations.
/// Abstracted for testing with mock implementations.
pub trait Filesystem: Send + Sync {
    /// Read file contents as a string.
    fn read_file(&self, path: &Path) -> Result<String, FsError>;

    /// Write data atomically to a path (write to temp, then rename).
    /// Parent directories are created when missing.
    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FsError>;

    /// Create a file that must not exist yet.
    /// Fails with `FsError::AlreadyExists` when it does.
    fn create_exclusive(&self, path: &Path, data: &[u8]) -> Result<(), FsError>;

    /// List regular files under `dir`, sorted by path.
    /// Descends into subdirectories only when `recursive` is set.
    fn list_files(&self, dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, FsError>;

    /// Remove a file.
    fn remove(&self, path: &Path) -> Result<(), FsError>;

    /// Check if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check if a path is an existing directory.
    fn is_dir(&self, path: &Path) -> bool;
}

impl<T: Filesystem + ?Sized> Filesystem for &T {
    fn read_file(&self, path: &Path) -> Result<String, FsError> {
        (**self).read_file(path)
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        (**self).write_atomic(path, data)
    }

    fn create_exclusive(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        (**self).create_exclusive(path, data)
    }

    fn list_files(&self, dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, FsError> {
        (**self).list_files(dir, recursive)
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        (**self).remove(path)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        (**self).is_dir(path)
    }
}

/// Real filesystem implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFilesystem;

/// Temp sibling used by `write_atomic`, hidden so discovery never picks it up.
fn temp_path_for(path: &Path) -> Result<PathBuf, FsError> {
    let name = path
        .file_name()
        .ok_or_else(|| FsError::Path(format!("no file name: {}", path.display())))?;
    let mut temp_name = std::ffi::OsString::from(".");
    temp_name.push(name);
    temp_name.push(".goldcheck-tmp");
    Ok(path.with_file_name(temp_name))
}

fn collect_files(dir: &Path, recursive: bool, out: &mut Vec<PathBuf>) -> Result<(), FsError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            if recursive {
                collect_files(&path, recursive, out)?;
            }
        } else if file_type.is_file() {
            out.push(path);
        } else if file_type.is_symlink() && path.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

impl Filesystem for RealFilesystem {
    fn read_file(&self, path: &Path) -> Result<String, FsError> {
        Ok(fs::read_to_string(path)?)
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = temp_path_for(path)?;
        fs::write(&temp_path, data)?;

        // Rename is atomic on most filesystems
        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        Ok(())
    }

    fn create_exclusive(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(FsError::AlreadyExists(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(data)?;
        file.sync_data()?;
        Ok(())
    }

    fn list_files(&self, dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, FsError> {
        let mut files = Vec::new();
        collect_files(dir, recursive, &mut files)?;
        files.sort();
        Ok(files)
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        fs::remove_file(path)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

/// Mock filesystem for testing.
/// Cloning creates a new handle to the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct MockFilesystem {
    files: Arc<RwLock<BTreeMap<PathBuf, Vec<u8>>>>,
    dirs: Arc<RwLock<BTreeSet<PathBuf>>>,
    write_count: Arc<RwLock<usize>>,
}

impl MockFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get content of a specific file.
    pub fn get_file(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.read().unwrap().get(path).cloned()
    }

    /// Get content of a specific file as text.
    pub fn get_text(&self, path: &Path) -> Option<String> {
        self.get_file(path)
            .map(|data| String::from_utf8_lossy(&data).into_owned())
    }

    /// Add a file directly (for test setup). Does not count as a write.
    pub fn add_file(&self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) {
        self.files.write().unwrap().insert(path.into(), data.into());
    }

    /// Register an (empty) directory.
    pub fn add_dir(&self, path: impl Into<PathBuf>) {
        self.dirs.write().unwrap().insert(path.into());
    }

    /// Number of `write_atomic` calls made through the trait.
    pub fn write_count(&self) -> usize {
        *self.write_count.read().unwrap()
    }
}

impl Filesystem for MockFilesystem {
    fn read_file(&self, path: &Path) -> Result<String, FsError> {
        let files = self.files.read().unwrap();
        match files.get(path) {
            Some(data) => String::from_utf8(data.clone())
                .map_err(|e| FsError::Path(format!("invalid utf8: {}", e))),
            None => Err(FsError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            ))),
        }
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        if let Some(parent) = path.parent() {
            self.dirs.write().unwrap().insert(parent.to_path_buf());
        }
        self.files
            .write()
            .unwrap()
            .insert(path.to_path_buf(), data.to_vec());
        *self.write_count.write().unwrap() += 1;
        Ok(())
    }

    fn create_exclusive(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        let mut files = self.files.write().unwrap();
        if files.contains_key(path) {
            return Err(FsError::AlreadyExists(path.to_path_buf()));
        }
        files.insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }

    fn list_files(&self, dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, FsError> {
        if !self.is_dir(dir) {
            return Err(FsError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {}", dir.display()),
            )));
        }

        // BTreeMap keys are already sorted
        let files = self
            .files
            .read()
            .unwrap()
            .keys()
            .filter(|path| match path.strip_prefix(dir) {
                Ok(rest) => recursive || rest.components().count() == 1,
                Err(_) => false,
            })
            .cloned()
            .collect();

        Ok(files)
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        match self.files.write().unwrap().remove(path) {
            Some(_) => Ok(()),
            None => Err(FsError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            ))),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path) || self.is_dir(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        if self.dirs.read().unwrap().contains(path) {
            return true;
        }
        // Any stored file below `path` implies the directory
        self.files
            .read()
            .unwrap()
            .keys()
            .any(|f| f != path && f.starts_with(path))
    }
}
