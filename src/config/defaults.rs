//! Default configuration values

/// Name of the build manifest at the root of every bundle
pub const BUILD_MANIFEST: &str = "BuildManifest.plist";

/// Staging directory created inside every working directory
pub const STAGING_DIR: &str = "ramdisk";

/// Raw ramdisk image extracted from its sealed container
pub const RAMDISK_IMAGE: &str = "ramdisk.dmg";

/// Size the ramdisk grows to when auxiliary content is added (bytes)
pub const RAMDISK_GROW_BYTES: u64 = 500_000_000;

/// Size the ramdisk grows to on hosts that mount it natively
pub const RAMDISK_RESIZE_NATIVE: &str = "5120MB";

/// Suffix an auxiliary ramdisk archive must carry
pub const EXTRA_RAMDISK_SUFFIX: &str = ".tar.gz";

/// Default python interpreter hosting pyimg4
pub const PYTHON: &str = "python3";

/// Key service request timeout (seconds)
pub const KEY_TIMEOUT_SECS: u64 = 30;

/// Mode given to patched executables and escalated binaries
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Companion file recording the restore command
pub const RESTORE_COMMAND_FILE: &str = "restore.command";
