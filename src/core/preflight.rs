//! Preflight checks
//!
//! Validates command-line inputs and verifies that every external program
//! the selected flow needs is installed, before any work starts.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::config::defaults::EXTRA_RAMDISK_SUFFIX;
use crate::core::platform::HostPlatform;
use crate::core::request::{Mode, PrepareRequest};
use crate::error::PreflightError;

/// Programs needed regardless of host platform
const COMMON_PROGRAMS: &[&str] = &[
    "futurerestore",
    "img4tool",
    "img4",
    "Kernel64Patcher",
    "iBoot64Patcher",
    "ldid",
    "asr64_patcher",
    "restored_external64_patcher",
    "tar",
];

/// Result of looking up one program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// Program name
    pub name: String,
    /// Resolved location, if found
    pub path: Option<PathBuf>,
}

impl CheckResult {
    /// Whether the program was found
    pub fn passed(&self) -> bool {
        self.path.is_some()
    }
}

/// Every program a run may invoke on `platform`
pub fn required_programs(platform: HostPlatform, python: &str) -> Vec<String> {
    COMMON_PROGRAMS
        .iter()
        .map(|p| (*p).to_string())
        .chain([python.to_string(), platform.image_tool().to_string()])
        .collect()
}

/// Look up each program in `search_path`
pub fn check_programs<S: AsRef<OsStr>>(programs: &[String], search_path: S) -> Vec<CheckResult> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    programs
        .iter()
        .map(|name| CheckResult {
            name: name.clone(),
            path: which::which_in(name, Some(search_path.as_ref()), &cwd).ok(),
        })
        .collect()
}

/// Fail on the first program that is missing
pub fn ensure_programs<S: AsRef<OsStr>>(
    programs: &[String],
    search_path: S,
) -> Result<(), PreflightError> {
    for check in check_programs(programs, search_path) {
        if !check.passed() {
            return Err(PreflightError::MissingProgram {
                program: check.name,
            });
        }
        tracing::debug!("Found {} at {:?}", check.name, check.path);
    }
    Ok(())
}

fn ensure_exists(kind: &str, path: &Path) -> Result<(), PreflightError> {
    if path.exists() {
        Ok(())
    } else {
        Err(PreflightError::MissingInput {
            kind: kind.to_string(),
            path: path.to_path_buf(),
        })
    }
}

/// Validate the inputs of a request
pub fn validate_request(request: &PrepareRequest) -> Result<(), PreflightError> {
    ensure_exists("IPSW", &request.ipsw)?;
    ensure_exists("Blob", &request.blob)?;

    if request.mode == Mode::Boot
        && request
            .identifier
            .as_deref()
            .map_or(true, |id| id.trim().is_empty())
    {
        return Err(PreflightError::MissingIdentifier);
    }

    if let Some(extra) = &request.extra_ramdisk {
        let well_named = extra.to_string_lossy().ends_with(EXTRA_RAMDISK_SUFFIX);
        if !extra.exists() || !well_named {
            return Err(PreflightError::BadExtraRamdisk {
                path: extra.clone(),
            });
        }
    }

    Ok(())
}
