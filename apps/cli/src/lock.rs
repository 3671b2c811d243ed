//! Single-instance guard for a source file.

use crate::error::{CliError, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Lock file next to the source, removed on drop.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    pub fn lock_path(source: &Path) -> PathBuf {
        let mut name = source.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Create the lock file. Fails if another session already holds it.
    pub fn acquire(source: &Path) -> Result<Self> {
        let path = Self::lock_path(source);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(CliError::AlreadyRunning(path));
            }
            Err(source) => return Err(CliError::Lock { path, source }),
        };
        if let Err(source) = writeln!(file, "{}", std::process::id()) {
            let _ = fs::remove_file(&path);
            return Err(CliError::Lock { path, source });
        }
        tracing::debug!(path = %path.display(), "instance lock acquired");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove lock file");
        }
    }
}
