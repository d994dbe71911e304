//! Install-root and config directory management
//!
//! The install root is the directory holding the running executable. Helper
//! programs shipped next to it (`bin/`) are preferred over `PATH`, boot
//! scripts live under `scripts/`, and prepared artifacts are moved there by
//! default.
//!
//! Environment variables can override defaults:
//! - `SUNSTORM_CONFIG_DIR` - Override config directory
//! - `SUNSTORM_ROOT` - Override install root

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable names for directory overrides
pub const ENV_CONFIG_DIR: &str = "SUNSTORM_CONFIG_DIR";
pub const ENV_ROOT: &str = "SUNSTORM_ROOT";

/// Application name used in directory paths
const APP_NAME: &str = "sunstorm";

const BIN_SUBDIR: &str = "bin";
const SCRIPTS_SUBDIR: &str = "scripts";

/// Directory provider for sunstorm
#[derive(Debug, Clone)]
pub struct SunstormDirs {
    config_dir: PathBuf,
    install_root: PathBuf,
}

impl SunstormDirs {
    /// Resolve directories from the environment and the running executable
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_dir: Self::resolve_config_dir(),
            install_root: Self::resolve_install_root(),
        }
    }

    /// Build a provider rooted at explicit paths
    #[must_use]
    pub fn with_paths(config_dir: PathBuf, install_root: PathBuf) -> Self {
        Self {
            config_dir,
            install_root,
        }
    }

    /// Get the config directory path
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get the install root
    #[must_use]
    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Directory of bundled helper programs
    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.install_root.join(BIN_SUBDIR)
    }

    /// Directory of boot executor scripts
    #[must_use]
    pub fn scripts_dir(&self) -> PathBuf {
        self.install_root.join(SCRIPTS_SUBDIR)
    }

    /// Get the config file path
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Program search path: bundled `bin/` first, then `PATH`
    #[must_use]
    pub fn tool_search_path(&self) -> OsString {
        let mut paths = vec![self.bin_dir()];
        if let Some(path) = env::var_os("PATH") {
            paths.extend(env::split_paths(&path));
        }
        env::join_paths(paths).unwrap_or_else(|_| self.bin_dir().into_os_string())
    }

    fn resolve_config_dir() -> PathBuf {
        if let Ok(path) = env::var(ENV_CONFIG_DIR) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".config").join(APP_NAME))
                    .unwrap_or_else(|| PathBuf::from(".").join(".config").join(APP_NAME))
            })
    }

    fn resolve_install_root() -> PathBuf {
        if let Ok(path) = env::var(ENV_ROOT) {
            return PathBuf::from(path);
        }

        env::current_exe()
            .ok()
            .and_then(|exe| exe.canonicalize().ok())
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Default for SunstormDirs {
    fn default() -> Self {
        Self::new()
    }
}
