use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

/// Represents errors that can occur during filesystem operations.
#[derive(Debug, Error)]
pub enum FilesystemError {
    /// Wrapper for standard IO errors.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Error for empty path input.
    #[error("Path is empty")]
    EmptyPath,
    /// The target exists and overwriting was not allowed.
    #[error("{0} already exists")]
    AlreadyExists(PathBuf),
}

/// Options for writing files.
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    /// If true, allows overwriting an existing file.
    pub overwrite: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self { overwrite: true }
    }
}

/// Creates a directory and its parents if it does not exist.
///
/// # Errors
///
/// Returns `FilesystemError` if the path is empty or the directory cannot be
/// created.
pub fn create_if_not_exists<P: AsRef<Path>>(dir: P) -> Result<(), FilesystemError> {
    let path = dir.as_ref();
    if path.as_os_str().is_empty() {
        return Err(FilesystemError::EmptyPath);
    }
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path)?;
    Ok(())
}

/// Reads a file into a string, returning `Ok(None)` when it does not exist.
pub fn read_if_exists<P: AsRef<Path>>(path: P) -> Result<Option<String>, FilesystemError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Writes `bytes` to `path` through a temporary file in the same directory,
/// so readers never observe a half-written file. Parent directories are
/// created as needed.
///
/// # Errors
///
/// Returns `FilesystemError::AlreadyExists` if the file exists and
/// `options.overwrite` is false, or an IO error if the write fails.
pub fn write_atomic<P: AsRef<Path>>(
    path: P,
    bytes: &[u8],
    options: WriteOptions,
) -> Result<(), FilesystemError> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(FilesystemError::EmptyPath);
    }
    if path.exists() && !options.overwrite {
        return Err(FilesystemError::AlreadyExists(path.to_path_buf()));
    }
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    create_if_not_exists(&parent)?;
    let mut temp = NamedTempFile::new_in(&parent)?;
    temp.write_all(bytes)?;
    temp.flush()?;
    temp.persist(path).map_err(|err| FilesystemError::Io(err.error))?;
    Ok(())
}

/// Removes a file if it exists.
pub fn remove_if_exists<P: AsRef<Path>>(path: P) -> Result<(), FilesystemError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Expands a path that starts with `~` to the user's home directory.
///
/// Returns an empty path if the home directory is unknown or the path uses
/// `~user` syntax.
pub fn expand_home(path: &str) -> PathBuf {
    if path.is_empty() {
        return PathBuf::new();
    }
    if !path.starts_with('~') {
        return PathBuf::from(path);
    }
    let home = match dirs::home_dir() {
        Some(h) => h,
        None => return PathBuf::new(),
    };
    if path == "~" {
        return home;
    }
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        return home.join(rest);
    }
    PathBuf::new()
}
