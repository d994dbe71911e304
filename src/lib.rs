//! Sunstorm - prepare firmware bundles for tethered restores and boots
//!
//! This library resolves firmware components from a bundle's build manifest,
//! drives the external patching and signing tools over them, rebuilds the
//! restore ramdisk and leaves the results ready for a restore or boot
//! executor.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Manifest model, image synthesis and the two pipelines
//! - [`infra`] - Infrastructure layer (processes, filesystem, archives, network)
//! - [`config`] - Configuration constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
