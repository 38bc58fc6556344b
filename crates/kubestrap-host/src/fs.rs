use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::error::{HostError, Result};

/// File access for step bodies.
///
/// Paths are always absolute host paths such as `/etc/fstab`; implementations
/// decide where they really live.
pub trait HostFs {
    /// Read a file, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    fn read(&self, path: &Path) -> Result<Option<String>>;

    /// Write a file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Remove a file or directory tree. Missing paths are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the path exists but cannot be removed.
    fn remove(&self, path: &Path) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;
}

/// The real filesystem, optionally under a root prefix.
///
/// With the default root `/` paths are used as given. Any other root maps
/// `/etc/fstab` to `<root>/etc/fstab`, which lets a pipeline run against a
/// scratch directory.
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl Default for LocalFs {
    fn default() -> Self {
        Self::new("/")
    }
}

impl LocalFs {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Where `path` lives on the real filesystem.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        let relative: PathBuf = path
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect();
        self.root.join(relative)
    }
}

impl HostFs for LocalFs {
    fn read(&self, path: &Path) -> Result<Option<String>> {
        let real = self.resolve(path);
        match fs::read_to_string(&real) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(HostError::Read { path: real, source }),
        }
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        let real = self.resolve(path);
        if let Some(parent) = real.parent() {
            fs::create_dir_all(parent).map_err(|source| HostError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&real, contents).map_err(|source| HostError::Write { path: real, source })
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let real = self.resolve(path);
        let result = if real.is_dir() {
            fs::remove_dir_all(&real)
        } else {
            fs::remove_file(&real)
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(HostError::Remove { path: real, source }),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }
}
