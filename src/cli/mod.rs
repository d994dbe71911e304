//! Command-line interface module
//!
//! This module handles argument parsing and operator output. It contains no
//! pipeline logic; that belongs in [`crate::core`].

pub mod commands;
pub mod output;

use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::Result;
use clap::{ArgGroup, Parser};

use crate::core::request::{Mode, PrepareRequest};

/// Version banner with build metadata when available
fn version() -> &'static str {
    static VERSION: OnceLock<String> = OnceLock::new();
    VERSION.get_or_init(|| {
        let mut version = env!("CARGO_PKG_VERSION").to_string();
        if let Some(sha) = option_env!("VERGEN_GIT_SHA") {
            version.push_str(&format!(" ({sha})"));
        }
        if let Some(date) = option_env!("VERGEN_BUILD_DATE") {
            version.push_str(&format!(" built {date}"));
        }
        if let Some(target) = option_env!("VERGEN_CARGO_TARGET_TRIPLE") {
            version.push_str(&format!(" for {target}"));
        }
        version
    })
}

/// Sunstorm - prepare firmware bundles for tethered restores and boots
#[derive(Parser, Debug)]
#[command(name = "sunstorm")]
#[command(author, version = version(), about, long_about = None)]
#[command(group(ArgGroup::new("mode").required(true).args(["boot", "restore"])))]
pub struct Cli {
    /// Create boot files
    #[arg(short, long)]
    pub boot: bool,

    /// Create restore files
    #[arg(short, long)]
    pub restore: bool,

    /// Path to the IPSW
    #[arg(short, long, value_name = "PATH")]
    pub ipsw: PathBuf,

    /// Path to the SHSH blob
    #[arg(short = 't', long, value_name = "PATH")]
    pub blob: PathBuf,

    /// BoardConfig to use (e.g. d221ap)
    #[arg(short = 'd', long = "boardconfig", value_name = "BOARD")]
    pub board_config: String,

    /// Use Kernel Patch Protection (required on devices older than A9)
    #[arg(long)]
    pub kpp: bool,

    /// Use legacy mode (firmware 14.2 and lower)
    #[arg(long)]
    pub legacy: bool,

    /// Skip baseband when restoring
    #[arg(long)]
    pub skip_baseband: bool,

    /// Device identifier, required for boot (e.g. iPhone10,3)
    #[arg(long, visible_alias = "id", value_name = "IDENTIFIER")]
    pub identifier: Option<String>,

    /// Add extra files to the ramdisk (a $file.tar.gz without a parent directory)
    #[arg(long, value_name = "PATH")]
    pub extra_ramdisk: Option<PathBuf>,

    /// Extra boot arguments for the boot files
    #[arg(long, value_name = "ARGS", default_value = "", allow_hyphen_values = true)]
    pub boot_arguments: String,

    /// Keep the working directory and intermediate files
    #[arg(long)]
    pub debug: bool,

    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Selected mode
    pub fn mode(&self) -> Mode {
        if self.boot {
            Mode::Boot
        } else {
            Mode::Restore
        }
    }

    /// Turn the parsed flags into a request
    pub fn request(&self) -> PrepareRequest {
        let mut request = PrepareRequest::new(
            self.mode(),
            self.ipsw.clone(),
            self.blob.clone(),
            &self.board_config,
        );
        request.kpp = self.kpp;
        request.legacy = self.legacy;
        request.skip_baseband = self.skip_baseband;
        request.identifier = self.identifier.clone();
        request.extra_ramdisk = self.extra_ramdisk.clone();
        request.boot_arguments = self.boot_arguments.clone();
        request.debug = self.debug;
        request
    }

    /// Execute the selected flow
    pub async fn run(self) -> Result<()> {
        let request = self.request();
        match request.mode {
            Mode::Restore => commands::restore::execute(request),
            Mode::Boot => commands::boot::execute(request).await,
        }
    }
}
