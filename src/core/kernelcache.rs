//! Kernel cache preparation
//!
//! The kernel is unwrapped with `pyimg4`, patched with `Kernel64Patcher`
//! and rewrapped with LZSS compression. Older device generations also carry
//! a patch-protection blob that has to travel with it.

use std::path::{Path, PathBuf};

use crate::core::pipeline::PipelineEnv;
use crate::core::stage::Stage;
use crate::core::workdir::WorkDir;
use crate::error::PipelineError;
use crate::infra::process::Invocation;

const RAW_KERNEL: &str = "kcache.raw";
const KPP_BLOB: &str = "kpp.bin";

/// Output names and patcher flags for one kernel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelProfile {
    /// Patched raw kernel, relative to the working directory
    pub patched: &'static str,
    /// Resealed kernel, relative to the working directory
    pub sealed: &'static str,
    pub patcher_flags: Vec<&'static str>,
}

impl KernelProfile {
    /// Kernel handed to the restore executor
    pub fn restore() -> Self {
        Self {
            patched: "krnl.patched",
            sealed: "krnl.im4p",
            patcher_flags: vec!["-f", "-a"],
        }
    }

    /// Kernel for a tethered boot; `-a` only when an auxiliary ramdisk is used
    pub fn boot(auxiliary_ramdisk: bool) -> Self {
        let mut patcher_flags = vec!["-f"];
        if auxiliary_ramdisk {
            patcher_flags.push("-a");
        }
        Self {
            patched: "krnlboot.patched",
            sealed: "krnlboot.im4p",
            patcher_flags,
        }
    }
}

/// One kernel being prepared inside a working directory
pub struct KernelJob<'a> {
    env: &'a PipelineEnv<'a>,
    work: &'a WorkDir,
    profile: KernelProfile,
    kpp: bool,
}

impl<'a> KernelJob<'a> {
    pub fn new(env: &'a PipelineEnv<'a>, work: &'a WorkDir, profile: KernelProfile, kpp: bool) -> Self {
        Self {
            env,
            work,
            profile,
            kpp,
        }
    }

    fn with_kpp(&self, invocation: Invocation) -> Invocation {
        if self.kpp {
            invocation.arg("--extra").arg_path(&self.work.join(KPP_BLOB))
        } else {
            invocation
        }
    }

    /// Unwrap `sealed` into the raw kernel
    pub fn extract(&self, sealed: &Path) -> Result<(), PipelineError> {
        let invocation = self
            .env
            .pyimg4()
            .args(["im4p", "extract", "-i"])
            .arg_path(sealed)
            .arg("-o")
            .arg_path(&self.work.join(RAW_KERNEL));
        self.env
            .run(&Stage::new("Extracting kernel", self.with_kpp(invocation)))?;
        Ok(())
    }

    /// Patch the raw kernel
    pub fn patch(&self) -> Result<(), PipelineError> {
        let invocation = Invocation::new("Kernel64Patcher")
            .arg_path(&self.work.join(RAW_KERNEL))
            .arg_path(&self.work.join(self.profile.patched))
            .args(self.profile.patcher_flags.iter().copied());
        self.env.run(&Stage::new("Patching kernel", invocation))?;
        Ok(())
    }

    /// Rewrap the patched kernel; returns the sealed file
    pub fn reseal(&self) -> Result<PathBuf, PipelineError> {
        let output = self.work.join(self.profile.sealed);
        let invocation = self
            .env
            .pyimg4()
            .args(["im4p", "create", "-i"])
            .arg_path(&self.work.join(self.profile.patched))
            .arg("-o")
            .arg_path(&output)
            .args(["-f", "rkrn", "--lzss"]);
        self.env
            .run(&Stage::new("Converting kernel", self.with_kpp(invocation)))?;
        Ok(output)
    }
}
