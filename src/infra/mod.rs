//! Infrastructure layer
//!
//! Handles I/O at the edges: external processes, the filesystem, bundle
//! archives and the key service.

pub mod archive;
pub mod dirs;
pub mod filesystem;
pub mod key_service;
pub mod process;
