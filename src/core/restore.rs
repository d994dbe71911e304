//! Restore flow
//!
//! Prepares a patched restore ramdisk and kernel, moves them next to the
//! install root, records the restore command and offers to run it.

use std::path::{Path, PathBuf};

use crate::config::defaults::RESTORE_COMMAND_FILE;
use crate::core::kernelcache::{KernelJob, KernelProfile};
use crate::core::manifest::components;
use crate::core::pipeline::{OpenedBundle, PipelineEnv};
use crate::core::prompt::Confirm;
use crate::core::ramdisk::{RamdiskPurpose, RamdiskSession};
use crate::core::request::PrepareRequest;
use crate::core::stage::{self, Stage};
use crate::error::PipelineError;
use crate::infra::filesystem;
use crate::infra::process::{Invocation, ToolGateway};

/// Question asked before running the restore executor
pub const RESTORE_PROMPT: &str = "Would you like to restore now? [Yy/Nn]:";

/// Progress of a restore run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreState {
    Extracted,
    RamdiskExtracted,
    RamdiskMounted,
    ToolsPatched,
    RamdiskSealed,
    KernelExtracted,
    KernelPatched,
    KernelSealed,
    ArtifactsRelocated,
    AwaitingUserConfirmation,
    Restored,
    Deferred,
}

/// Runs the restore flow for one request
pub struct RestoreFlow<'a> {
    env: &'a PipelineEnv<'a>,
    request: &'a PrepareRequest,
    states: Vec<RestoreState>,
}

impl<'a> RestoreFlow<'a> {
    pub fn new(env: &'a PipelineEnv<'a>, request: &'a PrepareRequest) -> Self {
        Self {
            env,
            request,
            states: Vec::new(),
        }
    }

    fn advance(&mut self, state: RestoreState) {
        tracing::debug!("Restore state: {:?}", state);
        self.states.push(state);
    }

    /// Build every artifact and relocate them
    ///
    /// The working directory is removed on any failure unless debug mode is
    /// active.
    pub fn prepare(mut self) -> Result<PreparedRestore, PipelineError> {
        let request = self.request;
        let env = self.env;
        let board = request.board_config.as_str();

        let bundle = OpenedBundle::open(&request.ipsw, "restore-", request.debug)?;
        self.advance(RestoreState::Extracted);
        bundle.ensure_board(board)?;

        let sealed_ramdisk = bundle.component(board, components::RESTORE_RAMDISK)?;
        let session = RamdiskSession::new(
            env,
            &bundle.work,
            RamdiskPurpose::Restore {
                legacy: request.legacy,
            },
            request.extra_ramdisk.as_deref(),
        );
        session.extract(&sealed_ramdisk)?;
        self.advance(RestoreState::RamdiskExtracted);

        session.open()?;
        session.add_auxiliary()?;
        self.advance(RestoreState::RamdiskMounted);

        session.patch_executables()?;
        self.advance(RestoreState::ToolsPatched);

        if let Some(report) = session.close()? {
            tracing::debug!(
                "Synthesis added {} files and {} symlinks",
                report.files_added,
                report.symlinks_added
            );
        }
        session.seal()?;
        drop(session);
        self.advance(RestoreState::RamdiskSealed);

        let sealed_kernel = bundle.component(board, components::RESTORE_KERNEL_CACHE)?;
        let kernel = KernelJob::new(env, &bundle.work, KernelProfile::restore(), request.kpp);
        kernel.extract(&sealed_kernel)?;
        self.advance(RestoreState::KernelExtracted);
        kernel.patch()?;
        self.advance(RestoreState::KernelPatched);
        kernel.reseal()?;
        self.advance(RestoreState::KernelSealed);

        let removed = bundle.work.prune("im4p")?;
        tracing::debug!("Pruned {} intermediate files", removed);
        let output_dir = bundle.work.relocate(&env.output_dir)?;
        self.advance(RestoreState::ArtifactsRelocated);

        let command = restore_command(request, &output_dir);
        filesystem::write_file(
            &output_dir.join(RESTORE_COMMAND_FILE),
            format!("{command}\n").as_bytes(),
        )?;

        Ok(PreparedRestore {
            output_dir,
            command,
            states: self.states,
        })
    }
}

/// Command that hands the artifacts in `output_dir` to the restore executor
pub fn restore_command(request: &PrepareRequest, output_dir: &Path) -> Invocation {
    Invocation::new("futurerestore")
        .arg("-t")
        .arg_path(&request.blob)
        .args(["--use-pwndfu", "--skip-blob", "--rdsk"])
        .arg_path(&output_dir.join("ramdisk.im4p"))
        .arg("--rkrn")
        .arg_path(&output_dir.join("krnl.im4p"))
        .arg("--latest-sep")
        .arg(if request.skip_baseband {
            "--no-baseband"
        } else {
            "--latest-baseband"
        })
        .arg_path(&request.ipsw)
}

/// Artifacts ready for the restore executor
#[derive(Debug)]
pub struct PreparedRestore {
    /// Relocated working directory
    pub output_dir: PathBuf,
    /// Restore command, also written to `restore.command`
    pub command: Invocation,
    /// States visited so far
    pub states: Vec<RestoreState>,
}

impl PreparedRestore {
    /// Path of the companion command file
    pub fn command_file(&self) -> PathBuf {
        self.output_dir.join(RESTORE_COMMAND_FILE)
    }

    /// Ask the operator and run the restore executor if they agree
    pub fn conclude(
        &mut self,
        gateway: &dyn ToolGateway,
        confirm: &dyn Confirm,
    ) -> Result<RestoreState, PipelineError> {
        self.states.push(RestoreState::AwaitingUserConfirmation);

        let state = if confirm.confirm(RESTORE_PROMPT)? {
            stage::run_stage(
                gateway,
                &Stage::new("Restoring device", self.command.clone()),
            )?;
            RestoreState::Restored
        } else {
            RestoreState::Deferred
        };
        self.states.push(state);
        Ok(state)
    }
}
