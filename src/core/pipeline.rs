//! Shared pipeline plumbing
//!
//! Both flows run against a [`PipelineEnv`] and start from an
//! [`OpenedBundle`]: a fresh working directory holding the expanded firmware
//! bundle and its parsed manifest.

use std::path::{Path, PathBuf};

use crate::config::defaults::BUILD_MANIFEST;
use crate::core::manifest::{BuildManifest, NotFound};
use crate::core::platform::HostPlatform;
use crate::core::stage::{self, Stage, StageOutcome, ToleratedFailure};
use crate::core::workdir::WorkDir;
use crate::error::PipelineError;
use crate::infra::archive;
use crate::infra::process::{Invocation, ToolGateway};

/// Everything a flow needs from its surroundings
pub struct PipelineEnv<'a> {
    pub gateway: &'a dyn ToolGateway,
    pub platform: HostPlatform,
    /// Interpreter hosting `pyimg4`
    pub python: String,
    /// Where prepared artifacts are moved
    pub output_dir: PathBuf,
    /// Directory of boot executor scripts
    pub scripts_dir: PathBuf,
}

impl<'a> PipelineEnv<'a> {
    /// `<python> -m pyimg4`
    pub fn pyimg4(&self) -> Invocation {
        Invocation::new(self.python.as_str()).args(["-m", "pyimg4"])
    }

    /// Run one stage
    pub fn run(&self, stage: &Stage) -> Result<StageOutcome, PipelineError> {
        stage::run_stage(self.gateway, stage)
    }

    /// Run stages in order
    pub fn run_all(&self, stages: &[Stage]) -> Result<Vec<ToleratedFailure>, PipelineError> {
        stage::run_stages(self.gateway, stages)
    }
}

/// Working directory with the expanded bundle
pub struct OpenedBundle {
    pub work: WorkDir,
    pub manifest: BuildManifest,
}

impl OpenedBundle {
    /// Expand `bundle` into a fresh working directory and parse its manifest
    pub fn open(bundle: &Path, prefix: &str, debug: bool) -> Result<Self, PipelineError> {
        let work = WorkDir::create(prefix, debug)?;

        tracing::info!("Extracting IPSW");
        archive::extract_bundle(bundle, work.path())?;

        let manifest = BuildManifest::load(&work.join(BUILD_MANIFEST))?;
        Ok(Self { work, manifest })
    }

    /// Fail unless `board` has a build identity
    pub fn ensure_board(&self, board: &str) -> Result<(), PipelineError> {
        if self.manifest.has_board(board) {
            Ok(())
        } else {
            Err(PipelineError::BoardNotRecognized {
                board: board.to_string(),
            })
        }
    }

    /// Path of `component` for `board`, inside the working directory
    pub fn component(&self, board: &str, component: &str) -> Result<PathBuf, PipelineError> {
        resolve(&self.manifest, board, component).map(|relative| self.work.join(relative))
    }
}

/// Resolve a component whose absence is fatal
pub fn resolve(
    manifest: &BuildManifest,
    board: &str,
    component: &str,
) -> Result<String, PipelineError> {
    manifest
        .resolve_component(board, component)
        .map(str::to_string)
        .map_err(|miss| match miss {
            NotFound::Board => PipelineError::BoardNotRecognized {
                board: board.to_string(),
            },
            NotFound::Component => PipelineError::ComponentMissing {
                board: board.to_string(),
                component: component.to_string(),
            },
        })
}
