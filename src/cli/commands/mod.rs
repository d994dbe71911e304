//! CLI command implementations
//!
//! Each flow has its own submodule. Both share [`RunContext`], which
//! validates the request, loads settings and checks for external programs
//! before any work starts.

pub mod boot;
pub mod restore;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::pipeline::PipelineEnv;
use crate::core::platform::HostPlatform;
use crate::core::preflight;
use crate::core::request::PrepareRequest;
use crate::core::settings::Settings;
use crate::infra::dirs::SunstormDirs;
use crate::infra::filesystem;
use crate::infra::process::SystemGateway;

/// Everything a flow needs, resolved once per invocation
pub struct RunContext {
    pub request: PrepareRequest,
    pub dirs: SunstormDirs,
    pub settings: Settings,
    pub platform: HostPlatform,
    pub gateway: SystemGateway,
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path).with_context(|| format!("Failed to resolve '{}'", path.display()))
}

impl RunContext {
    /// Validate inputs, load settings and check required programs
    pub fn prepare(mut request: PrepareRequest) -> Result<Self> {
        preflight::validate_request(&request)?;
        request.ipsw = absolute(&request.ipsw)?;
        request.blob = absolute(&request.blob)?;
        if let Some(extra) = &request.extra_ramdisk {
            request.extra_ramdisk = Some(absolute(extra)?);
        }

        let dirs = SunstormDirs::new();
        let settings = Settings::load(&dirs)?;
        let platform = HostPlatform::detect();
        tracing::debug!("Host platform: {:?}", platform);

        let search_path = dirs.tool_search_path();
        let programs = preflight::required_programs(platform, settings.python());
        preflight::ensure_programs(&programs, &search_path)?;

        let output_dir = settings.output_dir(&dirs);
        filesystem::create_dir_all(&output_dir)?;

        Ok(Self {
            request,
            dirs,
            settings,
            platform,
            gateway: SystemGateway::with_search_path(search_path),
        })
    }

    /// Pipeline environment backed by the system gateway
    pub fn env(&self) -> PipelineEnv<'_> {
        PipelineEnv {
            gateway: &self.gateway,
            platform: self.platform,
            python: self.settings.python().to_string(),
            output_dir: self.settings.output_dir(&self.dirs),
            scripts_dir: self.dirs.scripts_dir(),
        }
    }
}
