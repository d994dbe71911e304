//! Filesystem operations
//!
//! Handles directory moves and pruning of working directories.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::FilesystemError;

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remove a directory and all its contents
pub fn remove_dir_all(path: &Path) -> Result<(), FilesystemError> {
    if path.exists() {
        fs::remove_dir_all(path).map_err(|e| FilesystemError::Remove {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
    }
    Ok(())
}

/// Write content to a file
pub fn write_file(path: &Path, content: &[u8]) -> Result<(), FilesystemError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    fs::write(path, content).map_err(|e| FilesystemError::WriteFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remove every file under `root` whose name does not end with `suffix`
///
/// Directories are left in place. Returns the removed paths.
pub fn prune_except_suffix(root: &Path, suffix: &str) -> Result<Vec<PathBuf>, FilesystemError> {
    let mut removed = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| !e.file_type().is_dir())
    {
        let keep = entry.file_name().to_string_lossy().ends_with(suffix);
        if keep {
            continue;
        }
        fs::remove_file(entry.path()).map_err(|e| FilesystemError::Remove {
            path: entry.path().to_path_buf(),
            error: e.to_string(),
        })?;
        removed.push(entry.path().to_path_buf());
    }

    Ok(removed)
}

/// Move directory `from` into `dest_parent`, keeping its name
///
/// Falls back to copy-then-remove when a rename crosses filesystems.
pub fn move_dir_into(from: &Path, dest_parent: &Path) -> Result<PathBuf, FilesystemError> {
    let name = from.file_name().ok_or_else(|| FilesystemError::Move {
        from: from.to_path_buf(),
        to: dest_parent.to_path_buf(),
        error: "source has no file name".to_string(),
    })?;
    let to = dest_parent.join(name);
    create_dir_all(dest_parent)?;

    if fs::rename(from, &to).is_ok() {
        return Ok(to);
    }

    if let Err(e) = copy_tree(from, &to) {
        let _ = fs::remove_dir_all(&to);
        return Err(FilesystemError::Move {
            from: from.to_path_buf(),
            to,
            error: e.to_string(),
        });
    }
    remove_dir_all(from)?;
    Ok(to)
}

fn copy_tree(from: &Path, to: &Path) -> std::io::Result<()> {
    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(std::io::Error::other)?;
        let rel = entry.path().strip_prefix(from).map_err(std::io::Error::other)?;
        let target = to.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            std::os::unix::fs::symlink(link, &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
