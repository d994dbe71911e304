//! Ramdisk preparation shared by both flows
//!
//! The restore flow swaps `asr` (and, outside legacy mode,
//! `restored_external`) for patched builds. The boot flow only unpacks an
//! auxiliary archive into the ramdisk. Both extract the image, open it,
//! optionally grow it, write the staging tree back and seal it.

use std::cell::Cell;
use std::path::{Path, PathBuf};

use crate::config::defaults::{RAMDISK_GROW_BYTES, RAMDISK_IMAGE, RAMDISK_RESIZE_NATIVE};
use crate::core::pipeline::PipelineEnv;
use crate::core::platform::HostPlatform;
use crate::core::stage::Stage;
use crate::core::synth::{HfsImage, ImageSynthesizer, SynthesisReport};
use crate::core::workdir::WorkDir;
use crate::error::PipelineError;
use crate::infra::filesystem;
use crate::infra::process::Invocation;

/// `hfsplus chmod` argument for patched executables
const PATCHED_MODE: &str = "100755";

/// What the ramdisk is being prepared for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RamdiskPurpose {
    /// Sealed as an `rdsk` payload for the restore executor
    Restore { legacy: bool },
    /// Signed with the session manifest for a tethered boot
    Boot { im4m: PathBuf },
}

/// An executable replaced inside the ramdisk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchTarget {
    pub name: &'static str,
    /// Location inside the image
    pub image_path: &'static str,
    pub patcher: &'static str,
    /// Patched output, relative to the working directory
    pub patched: &'static str,
    /// Extracted entitlements, relative to the working directory
    pub entitlements: &'static str,
}

pub const ASR: PatchTarget = PatchTarget {
    name: "asr",
    image_path: "/usr/sbin/asr",
    patcher: "asr64_patcher",
    patched: "patched_asr",
    entitlements: "asr.plist",
};

pub const RESTORED_EXTERNAL: PatchTarget = PatchTarget {
    name: "restored_external",
    image_path: "/usr/local/bin/restored_external",
    patcher: "restored_external64_patcher",
    patched: "restored_external_patched",
    entitlements: "restored_external.plist",
};

/// One ramdisk being prepared inside a working directory
///
/// An image attached on the staging directory is detached when the session
/// is dropped, so a failed step never leaves it mounted inside the working
/// directory.
pub struct RamdiskSession<'a> {
    env: &'a PipelineEnv<'a>,
    work: &'a WorkDir,
    purpose: RamdiskPurpose,
    auxiliary: Option<PathBuf>,
    image: PathBuf,
    staging: PathBuf,
    mounted: Cell<bool>,
}

impl<'a> RamdiskSession<'a> {
    pub fn new(
        env: &'a PipelineEnv<'a>,
        work: &'a WorkDir,
        purpose: RamdiskPurpose,
        auxiliary: Option<&Path>,
    ) -> Self {
        Self {
            env,
            work,
            purpose,
            auxiliary: auxiliary.map(Path::to_path_buf),
            image: work.join(RAMDISK_IMAGE),
            staging: work.staging(),
            mounted: Cell::new(false),
        }
    }

    /// Executables replaced for this purpose
    pub fn targets(&self) -> Vec<PatchTarget> {
        match self.purpose {
            RamdiskPurpose::Restore { legacy: false } => vec![ASR, RESTORED_EXTERNAL],
            RamdiskPurpose::Restore { legacy: true } => vec![ASR],
            RamdiskPurpose::Boot { .. } => Vec::new(),
        }
    }

    fn hfs(&self) -> HfsImage {
        HfsImage::new(&self.image)
    }

    fn detach_stage(&self) -> Stage {
        Stage::new(
            "Detaching RamDisk",
            Invocation::new("hdiutil").arg("detach").arg_path(&self.staging),
        )
    }

    fn staged(&self, target: &PatchTarget) -> PathBuf {
        self.staging.join(target.image_path.trim_start_matches('/'))
    }

    /// Unwrap the ramdisk from its sealed container
    pub fn extract(&self, sealed: &Path) -> Result<(), PipelineError> {
        self.env.run(&Stage::new(
            "Extracting RamDisk",
            Invocation::new("img4")
                .arg("-i")
                .arg_path(sealed)
                .arg("-o")
                .arg_path(&self.image),
        ))?;
        Ok(())
    }

    /// Make the executables to patch reachable from the staging tree
    ///
    /// Native hosts attach the image on the staging directory. Elsewhere the
    /// executables are extracted and then removed from the image so they can
    /// be replaced.
    pub fn open(&self) -> Result<(), PipelineError> {
        match self.env.platform {
            HostPlatform::NativeMount => {
                self.env.run(&Stage::new(
                    "Mounting RamDisk",
                    Invocation::new("hdiutil")
                        .arg("attach")
                        .arg_path(&self.image)
                        .arg("-mountpoint")
                        .arg_path(&self.staging),
                ))?;
                self.mounted.set(true);
            }
            HostPlatform::ExternalPrimitives => {
                let hfs = self.hfs();
                for target in self.targets() {
                    let staged = self.staged(&target);
                    if let Some(parent) = staged.parent() {
                        filesystem::create_dir_all(parent)?;
                    }
                    self.env.run(&Stage::new(
                        format!("Extracting {}", target.name),
                        hfs.extract(target.image_path, &staged),
                    ))?;
                }
                for target in self.targets() {
                    self.env.run(&Stage::new(
                        format!("Removing {} from RamDisk", target.name),
                        hfs.remove(target.image_path),
                    ))?;
                }
            }
        }
        Ok(())
    }

    /// Unpack the auxiliary archive into the staging tree and grow the image
    pub fn add_auxiliary(&self) -> Result<(), PipelineError> {
        let Some(archive) = &self.auxiliary else {
            return Ok(());
        };

        let mut staging_arg = self.staging.display().to_string();
        staging_arg.push('/');
        let grow = match self.env.platform {
            HostPlatform::NativeMount => Invocation::new("hdiutil")
                .args(["resize", "-size", RAMDISK_RESIZE_NATIVE])
                .arg_path(&self.image),
            HostPlatform::ExternalPrimitives => self.hfs().grow(RAMDISK_GROW_BYTES),
        };

        self.env.run_all(&[
            Stage::new(
                "Extracting custom ramdisk tar-ball",
                Invocation::new("tar")
                    .arg("-C")
                    .arg(staging_arg)
                    .arg("-xf")
                    .arg_path(archive),
            ),
            Stage::new("Growing RamDisk", grow),
        ])?;
        Ok(())
    }

    /// Patch each executable, re-sign it with its original entitlements and
    /// copy it over the staged original
    pub fn patch_executables(&self) -> Result<(), PipelineError> {
        for target in self.targets() {
            let staged = self.staged(&target);
            let patched = self.work.join(target.patched);
            let entitlements = self.work.join(target.entitlements);

            self.env.run_all(&[
                Stage::new(
                    format!("Patching {}", target.name),
                    Invocation::new(target.patcher)
                        .arg_path(&staged)
                        .arg_path(&patched),
                ),
                Stage::new(
                    format!("Extracting {} entitlements", target.name),
                    Invocation::new("ldid").arg("-e").arg_path(&staged),
                )
                .capture_to(&entitlements),
                Stage::new(
                    format!("Signing patched {}", target.name),
                    Invocation::new("ldid")
                        .arg(format!("-S{}", entitlements.display()))
                        .arg_path(&patched),
                ),
                Stage::new(
                    format!("Setting permissions on patched {}", target.name),
                    Invocation::new("chmod").args(["-R", "755"]).arg_path(&patched),
                ),
                Stage::new(
                    format!("Copying patched {} into RamDisk", target.name),
                    Invocation::new("cp").arg_path(&patched).arg_path(&staged),
                ),
            ])?;
        }
        Ok(())
    }

    /// Write the staging tree back into the image
    ///
    /// Returns the synthesis report when the whole tree had to be replicated.
    pub fn close(&self) -> Result<Option<SynthesisReport>, PipelineError> {
        match self.env.platform {
            HostPlatform::NativeMount => {
                self.env.run(&self.detach_stage())?;
                self.mounted.set(false);
                Ok(None)
            }
            HostPlatform::ExternalPrimitives => {
                let report = if self.auxiliary.is_some() {
                    tracing::info!("Syncing staging tree into RamDisk");
                    Some(ImageSynthesizer::new(self.env.gateway, &self.image).synthesize(&self.staging)?)
                } else {
                    None
                };

                let hfs = self.hfs();
                for target in self.targets() {
                    self.env.run_all(&[
                        Stage::new(
                            format!("Adding patched {} to RamDisk", target.name),
                            hfs.add(&self.staged(&target), target.image_path),
                        ),
                        Stage::new(
                            format!("Setting permissions on {}", target.image_path),
                            hfs.chmod(PATCHED_MODE, target.image_path),
                        ),
                    ])?;
                }
                Ok(report)
            }
        }
    }

    /// Seal the image; returns the sealed file
    pub fn seal(&self) -> Result<PathBuf, PipelineError> {
        let (description, output, invocation) = match &self.purpose {
            RamdiskPurpose::Restore { .. } => {
                let output = self.work.join("ramdisk.im4p");
                let invocation = self
                    .env
                    .pyimg4()
                    .args(["im4p", "create", "-i"])
                    .arg_path(&self.image)
                    .arg("-o")
                    .arg_path(&output)
                    .args(["-f", "rdsk"]);
                ("Creating RamDisk IM4P", output, invocation)
            }
            RamdiskPurpose::Boot { im4m } => {
                let output = self.work.join("ramdisk.img4");
                let invocation = Invocation::new("img4")
                    .arg("-i")
                    .arg_path(&self.image)
                    .arg("-o")
                    .arg_path(&output)
                    .arg("-M")
                    .arg_path(im4m)
                    .args(["-A", "-T", "rdsk"]);
                ("Signing RamDisk", output, invocation)
            }
        };
        self.env.run(&Stage::new(description, invocation))?;
        Ok(output)
    }

    /// Run every step in order; returns the sealed image
    pub fn prepare(&self, sealed: &Path) -> Result<PathBuf, PipelineError> {
        self.extract(sealed)?;
        self.open()?;
        self.add_auxiliary()?;
        self.patch_executables()?;
        self.close()?;
        self.seal()
    }
}

impl Drop for RamdiskSession<'_> {
    fn drop(&mut self) {
        if !self.mounted.replace(false) {
            return;
        }
        if let Err(e) = self.env.run(&self.detach_stage()) {
            tracing::error!("Failed to detach {}: {}", self.staging.display(), e);
        }
    }
}
