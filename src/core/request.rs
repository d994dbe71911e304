//! What the operator asked for
//!
//! A [`PrepareRequest`] is built once from the command line and handed to
//! preflight checks and then to exactly one flow.

use std::path::PathBuf;

/// Which artifact set to prepare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Boot files for an already-restored device
    Boot,
    /// Restore ramdisk and kernel plus the restore command
    Restore,
}

/// Inputs and feature flags of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareRequest {
    pub mode: Mode,
    /// Firmware bundle (zip)
    pub ipsw: PathBuf,
    /// Signed ticket
    pub blob: PathBuf,
    /// Board config, lower-cased
    pub board_config: String,
    /// Kernel needs a patch-protection blob
    pub kpp: bool,
    /// Older firmware without `restored_external`/trust caches
    pub legacy: bool,
    pub skip_baseband: bool,
    /// Device identifier, required for boot
    pub identifier: Option<String>,
    /// User archive unpacked into the ramdisk
    pub extra_ramdisk: Option<PathBuf>,
    /// Appended after `-v` on the second-stage loader
    pub boot_arguments: String,
    /// Keep the working directory around
    pub debug: bool,
}

impl PrepareRequest {
    /// Create a request with all optional features off
    pub fn new(mode: Mode, ipsw: PathBuf, blob: PathBuf, board_config: &str) -> Self {
        Self {
            mode,
            ipsw,
            blob,
            board_config: board_config.to_lowercase(),
            kpp: false,
            legacy: false,
            skip_baseband: false,
            identifier: None,
            extra_ramdisk: None,
            boot_arguments: String::new(),
            debug: false,
        }
    }

    /// Whether an auxiliary ramdisk archive was supplied
    pub fn has_extra_ramdisk(&self) -> bool {
        self.extra_ramdisk.is_some()
    }
}
