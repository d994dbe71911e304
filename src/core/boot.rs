//! Boot flow
//!
//! Produces signed loaders, device tree, trust cache and kernel for a
//! tethered boot, plus an optional signed ramdisk carrying auxiliary
//! content. The boot itself is left to an external script.

use std::path::{Path, PathBuf};

use crate::cli::output::print_warning;
use crate::core::kernelcache::{KernelJob, KernelProfile};
use crate::core::keys::{KeyProvider, KeyQuery, LoaderKeys};
use crate::core::manifest::components;
use crate::core::pipeline::{OpenedBundle, PipelineEnv};
use crate::core::ramdisk::{RamdiskPurpose, RamdiskSession};
use crate::core::request::PrepareRequest;
use crate::core::stage::Stage;
use crate::error::PipelineError;
use crate::infra::process::Invocation;

/// Session signing manifest converted from the blob
const IM4M: &str = "IM4M";

/// Boot script for devices that need a patch-protection blob
pub const BOOT_SCRIPT_KPP: &str = "boot.sh";
/// Boot script for everything else
pub const BOOT_SCRIPT: &str = "boot-A10plus.sh";

/// Progress of a boot run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootState {
    Extracted,
    KeysResolved,
    LoadersDecrypted,
    LoadersPatched,
    AuthorizationConverted,
    LoadersSealed,
    DeviceTreeSigned,
    TrustCacheSigned,
    KernelPrepared,
    AuxiliaryRamdiskPrepared,
    ArtifactsRelocated,
    Done,
}

/// Result of a successful boot run
#[derive(Debug)]
pub struct BootOutcome {
    /// Relocated working directory
    pub output_dir: PathBuf,
    /// Script the operator runs next
    pub boot_script: PathBuf,
    /// States visited
    pub states: Vec<BootState>,
}

/// Arguments passed to the second-stage loader
pub fn boot_arguments(extra: &str) -> String {
    format!("-v {extra}").trim().to_string()
}

/// Script that boots the prepared files
pub fn boot_script(scripts_dir: &Path, kpp: bool) -> PathBuf {
    scripts_dir.join(if kpp { BOOT_SCRIPT_KPP } else { BOOT_SCRIPT })
}

/// Runs the boot flow for one request
pub struct BootFlow<'a> {
    env: &'a PipelineEnv<'a>,
    request: &'a PrepareRequest,
    states: Vec<BootState>,
}

impl<'a> BootFlow<'a> {
    pub fn new(env: &'a PipelineEnv<'a>, request: &'a PrepareRequest) -> Self {
        Self {
            env,
            request,
            states: Vec::new(),
        }
    }

    fn advance(&mut self, state: BootState) {
        tracing::debug!("Boot state: {:?}", state);
        self.states.push(state);
    }

    fn run(&self, description: &str, invocation: Invocation) -> Result<(), PipelineError> {
        self.env.run(&Stage::new(description, invocation))?;
        Ok(())
    }

    /// Fetch loader keys; failures degrade to empty keys with a warning
    async fn resolve_keys<K: KeyProvider>(&self, provider: &K, build: &str) -> LoaderKeys {
        let query = KeyQuery {
            identifier: self.request.identifier.clone().unwrap_or_default(),
            board: self.request.board_config.clone(),
            build: build.to_string(),
        };
        tracing::info!(
            "Getting keys for {} {} {}",
            query.identifier,
            query.board,
            query.build
        );

        let keys = match provider.loader_keys(&query).await {
            Ok(keys) => keys,
            Err(e) => {
                print_warning(&e.to_string());
                LoaderKeys::default()
            }
        };
        if keys.ibss().is_none() {
            print_warning("Failed to get iBSS keys (possible incorrect identifier or boardconfig)");
        }
        if keys.ibec().is_none() {
            print_warning("Failed to get iBEC keys (possible incorrect identifier or boardconfig)");
        }
        keys
    }

    /// Build every artifact and relocate them
    pub async fn run_with<K: KeyProvider>(mut self, provider: &K) -> Result<BootOutcome, PipelineError> {
        let request = self.request;
        let env = self.env;
        let board = request.board_config.as_str();

        let bundle = OpenedBundle::open(&request.ipsw, "boot-", request.debug)?;
        self.advance(BootState::Extracted);
        bundle.ensure_board(board)?;
        let work = &bundle.work;

        let build = bundle.manifest.product_build_version()?.to_string();
        let keys = self.resolve_keys(provider, &build).await;
        self.advance(BootState::KeysResolved);

        let ibss = bundle.component(board, components::IBSS)?;
        let ibec = bundle.component(board, components::IBEC)?;
        let ibss_key = keys.ibss().ok_or_else(|| PipelineError::MissingLoaderKey {
            image: components::IBSS.to_string(),
        })?;
        let ibec_key = keys.ibec().ok_or_else(|| PipelineError::MissingLoaderKey {
            image: components::IBEC.to_string(),
        })?;
        self.run(
            "Decrypting iBSS",
            Invocation::new("img4")
                .arg("-i")
                .arg_path(&ibss)
                .arg("-o")
                .arg_path(&work.join("ibss.dmg"))
                .arg("-k")
                .arg(ibss_key),
        )?;
        self.run(
            "Decrypting iBEC",
            Invocation::new("img4")
                .arg("-i")
                .arg_path(&ibec)
                .arg("-o")
                .arg_path(&work.join("ibec.dmg"))
                .arg("-k")
                .arg(ibec_key),
        )?;
        self.advance(BootState::LoadersDecrypted);

        self.run(
            "Patching iBSS",
            Invocation::new("iBoot64Patcher")
                .arg_path(&work.join("ibss.dmg"))
                .arg_path(&work.join("ibss.patched")),
        )?;
        self.run(
            "Patching iBEC",
            Invocation::new("iBoot64Patcher")
                .arg_path(&work.join("ibec.dmg"))
                .arg_path(&work.join("ibec.patched"))
                .args(["-n", "-b"])
                .arg(boot_arguments(&request.boot_arguments)),
        )?;
        self.advance(BootState::LoadersPatched);

        let im4m = work.join(IM4M);
        self.run(
            "Converting blob into IM4M",
            Invocation::new("img4tool")
                .args(["-e", "-s"])
                .arg_path(&request.blob)
                .arg("-m")
                .arg_path(&im4m),
        )?;
        self.advance(BootState::AuthorizationConverted);

        for (name, tag) in [("ibss", "ibss"), ("ibec", "ibec")] {
            self.run(
                &format!("Signing {name}"),
                Invocation::new("img4")
                    .arg("-i")
                    .arg_path(&work.join(format!("{name}.patched")))
                    .arg("-o")
                    .arg_path(&work.join(format!("{name}.img4")))
                    .arg("-M")
                    .arg_path(&im4m)
                    .args(["-A", "-T", tag]),
            )?;
        }
        self.advance(BootState::LoadersSealed);

        let device_tree = bundle.component(board, components::DEVICE_TREE)?;
        self.run(
            "Signing DeviceTree",
            sign(&device_tree, &work.join("devicetree.img4"), &im4m, "rdtr"),
        )?;
        self.advance(BootState::DeviceTreeSigned);

        if request.legacy {
            tracing::debug!("Legacy firmware, skipping trust cache");
        } else {
            let trust_cache = bundle.component(board, components::STATIC_TRUST_CACHE)?;
            self.run(
                "Signing trust cache",
                sign(&trust_cache, &work.join("trustcache.img4"), &im4m, "rtsc"),
            )?;
            self.advance(BootState::TrustCacheSigned);
        }

        let sealed_kernel = bundle.component(board, components::KERNEL_CACHE)?;
        let kernel = KernelJob::new(
            env,
            work,
            KernelProfile::boot(request.has_extra_ramdisk()),
            request.kpp,
        );
        kernel.extract(&sealed_kernel)?;
        kernel.patch()?;
        let kernel_im4p = kernel.reseal()?;
        self.run(
            "Signing kernel",
            env.pyimg4()
                .args(["img4", "create", "-p"])
                .arg_path(&kernel_im4p)
                .arg("-o")
                .arg_path(&work.join("krnlboot.img4"))
                .arg("-m")
                .arg_path(&im4m),
        )?;
        self.advance(BootState::KernelPrepared);

        if let Some(extra) = request.extra_ramdisk.as_deref() {
            let sealed_ramdisk = bundle.component(board, components::RESTORE_RAMDISK)?;
            RamdiskSession::new(env, work, RamdiskPurpose::Boot { im4m: im4m.clone() }, Some(extra))
                .prepare(&sealed_ramdisk)?;
            self.advance(BootState::AuxiliaryRamdiskPrepared);
        }

        let removed = bundle.work.prune("img4")?;
        tracing::debug!("Pruned {} intermediate files", removed);
        let output_dir = bundle.work.relocate(&env.output_dir)?;
        self.advance(BootState::ArtifactsRelocated);
        self.advance(BootState::Done);

        Ok(BootOutcome {
            output_dir,
            boot_script: boot_script(&env.scripts_dir, request.kpp),
            states: self.states,
        })
    }
}

/// `img4 -i <input> -o <output> -M <im4m> -T <tag>`
fn sign(input: &Path, output: &Path, im4m: &Path, tag: &str) -> Invocation {
    Invocation::new("img4")
        .arg("-i")
        .arg_path(input)
        .arg("-o")
        .arg_path(output)
        .arg("-M")
        .arg_path(im4m)
        .args(["-T", tag])
}
