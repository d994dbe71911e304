//! Build manifest (`BuildManifest.plist`) parsing and component lookup
//!
//! A bundle's manifest lists one build identity per board variant. Each
//! identity maps component names to paths relative to the expanded bundle.
//! Board matching is case-insensitive because vendor metadata is not
//! consistent about case.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ManifestError;

/// Well-known component names
pub mod components {
    pub const RESTORE_RAMDISK: &str = "RestoreRamDisk";
    pub const RESTORE_KERNEL_CACHE: &str = "RestoreKernelCache";
    pub const KERNEL_CACHE: &str = "KernelCache";
    pub const IBSS: &str = "iBSS";
    pub const IBEC: &str = "iBEC";
    pub const DEVICE_TREE: &str = "DeviceTree";
    pub const STATIC_TRUST_CACHE: &str = "StaticTrustCache";
}

/// Why a component lookup came back empty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFound {
    /// No identity carries the requested board
    Board,
    /// The board exists but does not list the component
    Component,
}

/// One board variant's component table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildIdentity {
    /// Board config as written in the manifest
    pub board_config: String,
    /// Component name to bundle-relative path
    pub components: BTreeMap<String, String>,
}

impl BuildIdentity {
    /// Case-insensitive board comparison
    pub fn matches(&self, board: &str) -> bool {
        self.board_config.eq_ignore_ascii_case(board)
    }
}

/// Parsed build manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildManifest {
    /// Identities in manifest order
    pub identities: Vec<BuildIdentity>,
    /// Global build version, e.g. `18A373`
    pub product_build_version: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawManifest {
    build_identities: Vec<RawIdentity>,
    #[serde(default)]
    product_build_version: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawIdentity {
    #[serde(default)]
    info: RawIdentityInfo,
    #[serde(default)]
    manifest: BTreeMap<String, RawComponent>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct RawIdentityInfo {
    #[serde(default)]
    device_class: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawComponent {
    #[serde(default)]
    info: Option<RawComponentInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawComponentInfo {
    #[serde(default)]
    path: Option<String>,
}

impl BuildManifest {
    /// Parse a manifest from raw property-list bytes (XML or binary)
    pub fn parse(bytes: &[u8]) -> Result<Self, ManifestError> {
        let raw: RawManifest = plist::from_bytes(bytes).map_err(|e| ManifestError::Parse {
            error: e.to_string(),
        })?;

        let identities = raw
            .build_identities
            .into_iter()
            .filter_map(|identity| {
                let board_config = identity.info.device_class?;
                let components = identity
                    .manifest
                    .into_iter()
                    .filter_map(|(name, component)| {
                        component.info.and_then(|info| info.path).map(|path| (name, path))
                    })
                    .collect();
                Some(BuildIdentity {
                    board_config,
                    components,
                })
            })
            .collect();

        Ok(Self {
            identities,
            product_build_version: raw.product_build_version,
        })
    }

    /// Read and parse the manifest at `path`
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let bytes = std::fs::read(path).map_err(|e| ManifestError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::parse(&bytes)
    }

    /// First identity whose board matches, ignoring case
    pub fn identity(&self, board: &str) -> Option<&BuildIdentity> {
        self.identities.iter().find(|identity| identity.matches(board))
    }

    /// Whether any identity carries `board`
    pub fn has_board(&self, board: &str) -> bool {
        self.identity(board).is_some()
    }

    /// Path of `component` for `board`
    ///
    /// Absence is an ordinary result: callers decide whether a missing
    /// component is expected.
    pub fn resolve_component(&self, board: &str, component: &str) -> Result<&str, NotFound> {
        let identity = self.identity(board).ok_or(NotFound::Board)?;
        identity
            .components
            .get(component)
            .map(String::as_str)
            .ok_or(NotFound::Component)
    }

    /// Global build version
    pub fn product_build_version(&self) -> Result<&str, ManifestError> {
        self.product_build_version
            .as_deref()
            .ok_or_else(|| ManifestError::FieldMissing {
                field: "ProductBuildVersion".to_string(),
            })
    }
}
