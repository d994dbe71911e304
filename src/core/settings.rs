//! Operator settings
//!
//! Reads optional settings from `config.toml` in the config directory.
//! Every field is optional; the effective value falls back to the built-in
//! default. `SUNSTORM_KEYS_URL` and `SUNSTORM_OUTPUT_DIR` override the file.

use crate::config::defaults::{KEY_TIMEOUT_SECS, PYTHON};
use crate::config::urls::KEY_SERVICE;
use crate::error::ConfigError;
use crate::infra::dirs::SunstormDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment override for the key service URL
pub const ENV_KEYS_URL: &str = "SUNSTORM_KEYS_URL";
/// Environment override for the output directory
pub const ENV_OUTPUT_DIR: &str = "SUNSTORM_OUTPUT_DIR";

/// Settings loaded from `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub keys: KeySettings,

    #[serde(default)]
    pub tools: ToolSettings,

    #[serde(default)]
    pub output: OutputSettings,
}

/// Key service settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySettings {
    /// Base URL of the key service
    pub url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// External tool settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Interpreter hosting `pyimg4`
    pub python: Option<String>,
}

/// Output settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Where prepared artifacts are moved
    pub dir: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the config directory, then apply environment overrides
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the file exists but is not valid TOML.
    pub fn load(dirs: &SunstormDirs) -> Result<Self, ConfigError> {
        let mut settings = Self::load_from_path(&dirs.config_path())?;
        settings.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Load settings from a specific path; a missing file yields defaults
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }

    /// Overlay values from `lookup` (usually the process environment)
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_KEYS_URL).filter(|v| !v.is_empty()) {
            self.keys.url = Some(url);
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.is_empty()) {
            self.output.dir = Some(PathBuf::from(dir));
        }
    }

    /// Effective key service URL
    pub fn keys_url(&self) -> &str {
        self.keys.url.as_deref().unwrap_or(KEY_SERVICE)
    }

    /// Effective key request timeout in seconds
    pub fn keys_timeout_secs(&self) -> u64 {
        self.keys.timeout_secs.unwrap_or(KEY_TIMEOUT_SECS)
    }

    /// Effective python interpreter
    pub fn python(&self) -> &str {
        self.tools.python.as_deref().unwrap_or(PYTHON)
    }

    /// Effective output directory; defaults to the install root
    pub fn output_dir(&self, dirs: &SunstormDirs) -> PathBuf {
        self.output
            .dir
            .clone()
            .unwrap_or_else(|| dirs.install_root().to_path_buf())
    }
}
