//! Core pipeline logic
//!
//! External programs are only ever reached through
//! [`crate::infra::process::ToolGateway`], so everything here can be driven
//! by a recording gateway in tests.
//!
//! # Submodules
//!
//! - [`manifest`] - Build manifest parsing and component lookup
//! - [`synth`] - Replicating a staging tree into an image through `hfsplus`
//! - [`stage`] - Pipeline stages and their interpretation
//! - [`pipeline`] - Shared environment and bundle handling
//! - [`ramdisk`] - Ramdisk preparation shared by both flows
//! - [`kernelcache`] - Kernel extraction, patching and resealing
//! - [`restore`] - Restore flow
//! - [`boot`] - Boot flow
//! - [`keys`] - Loader decryption keys
//! - [`preflight`] - Input validation and dependency checks
//! - [`settings`] - Operator settings from `config.toml`
//! - [`workdir`] - Scoped working directory
//! - [`prompt`] - Operator confirmation
//! - [`platform`] - Host platform capabilities
//! - [`request`] - What the operator asked for

pub mod boot;
pub mod kernelcache;
pub mod keys;
pub mod manifest;
pub mod pipeline;
pub mod platform;
pub mod preflight;
pub mod prompt;
pub mod ramdisk;
pub mod request;
pub mod restore;
pub mod settings;
pub mod stage;
pub mod synth;
pub mod workdir;
