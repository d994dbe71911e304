//! Per-invocation working directory
//!
//! [`WorkDir`] owns the scratch directory of one pipeline run. It is removed
//! when dropped, on success and failure alike, unless debug mode asked to keep
//! it or it has been relocated next to the install root.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::config::defaults::STAGING_DIR;
use crate::error::FilesystemError;
use crate::infra::filesystem;

/// Scoped working directory
#[derive(Debug)]
pub struct WorkDir {
    dir: Option<TempDir>,
    path: PathBuf,
    debug: bool,
}

impl WorkDir {
    /// Create `<tmp>/<prefix>XXXX` with an empty staging subdirectory
    pub fn create(prefix: &str, debug: bool) -> Result<Self, FilesystemError> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .map_err(|e| FilesystemError::CreateDir {
                path: std::env::temp_dir().join(prefix),
                error: e.to_string(),
            })?;
        let path = dir.path().to_path_buf();
        filesystem::create_dir_all(&path.join(STAGING_DIR))?;
        tracing::debug!("Working directory {}", path.display());

        Ok(Self {
            dir: Some(dir),
            path,
            debug,
        })
    }

    /// Root of the working directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of `name` inside the working directory
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// Staging tree replicated into the ramdisk
    pub fn staging(&self) -> PathBuf {
        self.path.join(STAGING_DIR)
    }

    /// Delete intermediate files, keeping names ending in `suffix`
    ///
    /// Nothing is removed in debug mode.
    pub fn prune(&self, suffix: &str) -> Result<usize, FilesystemError> {
        if self.debug {
            tracing::debug!("Debug mode, keeping intermediate files");
            return Ok(0);
        }
        let removed = filesystem::prune_except_suffix(&self.path, suffix)?;
        Ok(removed.len())
    }

    /// Move the directory into `dest_parent` and stop managing it
    ///
    /// On failure the directory stays armed and is removed on drop.
    pub fn relocate(mut self, dest_parent: &Path) -> Result<PathBuf, FilesystemError> {
        let moved = filesystem::move_dir_into(&self.path, dest_parent)?;
        if let Some(dir) = self.dir.take() {
            // Already moved away; only the handle is released here.
            let _ = dir.keep();
        }
        Ok(moved.canonicalize().unwrap_or(moved))
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        if self.debug {
            let kept = dir.keep();
            tracing::warn!("Debug mode, leaving {} in place", kept.display());
        } else if let Err(e) = dir.close() {
            tracing::error!("Failed to remove {} (this is a bug): {}", self.path.display(), e);
        }
    }
}
