//! Filesystem image synthesis through external primitives
//!
//! Hosts that cannot mount the ramdisk's filesystem natively drive the
//! `hfsplus` tool instead. It offers mkdir, add, link, chmod, extract, rm
//! and grow, but nothing like "create parents as needed", so a staged tree
//! is replicated in two passes: every directory first, then every file and
//! symlink followed by a chmod.
//!
//! Per-entry failures never abort synthesis; the tool is known to fail on
//! borderline inputs. They are collected in [`SynthesisReport::tolerated`].

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::defaults::EXECUTABLE_MODE;
use crate::core::stage::{self, Stage, StageOutcome, ToleratedFailure};
use crate::error::SynthesisError;
use crate::infra::process::{Invocation, ToolGateway};

/// Directories whose entries must be executable
pub const EXECUTABLE_DIRS: &[&str] = &["bin", "sbin", "libexec"];

/// Regular-file type bits prefixed to escalated modes
const S_IFREG: u32 = 0o100_000;

/// Permission and special bits kept from captured metadata
const MODE_MASK: u32 = 0o7777;

/// Kind of a staged entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    RegularFile,
    Symlink,
}

/// One node of the staging tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemEntry {
    /// Path inside the image, always starting with `/`
    pub relative_path: String,
    /// Path of the staged node on the host
    pub source: PathBuf,
    pub kind: EntryKind,
    /// Captured mode, permission and special bits only
    pub permission_bits: u32,
    /// Link target, for symlinks only
    pub symlink_target: Option<PathBuf>,
}

impl FilesystemEntry {
    /// Mode to apply after placing the entry
    pub fn effective_mode(&self) -> ModeDecision {
        effective_mode(&self.relative_path, self.permission_bits)
    }
}

/// Mode chosen for an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeDecision {
    /// Permission and special bits
    pub mode: u32,
    /// Whether the captured mode was raised to executable
    pub escalated: bool,
}

impl ModeDecision {
    /// Octal argument for `hfsplus chmod`
    pub fn chmod_arg(&self) -> String {
        if self.escalated {
            format!("{:o}", S_IFREG | self.mode)
        } else {
            format!("{:o}", self.mode)
        }
    }
}

/// Raise entries directly under bin/sbin/libexec to at least 0755
///
/// Special bits are carried through; a mode whose permission bits already
/// compare >= 0755 is returned untouched.
pub fn effective_mode(relative_path: &str, captured: u32) -> ModeDecision {
    let captured = captured & MODE_MASK;
    let parent_is_executable_dir = Path::new(relative_path)
        .parent()
        .and_then(Path::file_name)
        .and_then(|name| name.to_str())
        .is_some_and(|name| EXECUTABLE_DIRS.contains(&name));

    if parent_is_executable_dir && (captured & 0o777) < EXECUTABLE_MODE {
        ModeDecision {
            mode: (captured & 0o7000) | EXECUTABLE_MODE,
            escalated: true,
        }
    } else {
        ModeDecision {
            mode: captured,
            escalated: false,
        }
    }
}

/// Walk `root` and describe every node below it
///
/// Unreadable nodes are logged and skipped.
pub fn scan_staging_tree(root: &Path) -> Vec<FilesystemEntry> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable staging entry: {}", e);
                continue;
            }
        };
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", entry.path().display(), e);
                continue;
            }
        };

        let file_type = entry.file_type();
        let (kind, symlink_target) = if file_type.is_dir() {
            (EntryKind::Directory, None)
        } else if file_type.is_symlink() {
            match std::fs::read_link(entry.path()) {
                Ok(target) => (EntryKind::Symlink, Some(target)),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            }
        } else {
            (EntryKind::RegularFile, None)
        };

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };

        entries.push(FilesystemEntry {
            relative_path: image_path(relative),
            source: entry.path().to_path_buf(),
            kind,
            permission_bits: metadata.permissions().mode() & MODE_MASK,
            symlink_target,
        });
    }

    entries
}

/// Normalize a staging-relative path to an absolute image path
fn image_path(relative: &Path) -> String {
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{joined}")
}

/// Command builder for one `hfsplus` image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HfsImage {
    image: PathBuf,
}

impl HfsImage {
    pub fn new(image: &Path) -> Self {
        Self {
            image: image.to_path_buf(),
        }
    }

    /// Path of the image file
    pub fn path(&self) -> &Path {
        &self.image
    }

    fn op(&self, op: &str) -> Invocation {
        Invocation::new("hfsplus").arg_path(&self.image).arg(op)
    }

    pub fn mkdir(&self, path: &str) -> Invocation {
        self.op("mkdir").arg(path)
    }

    pub fn add(&self, source: &Path, dest: &str) -> Invocation {
        self.op("add").arg_path(source).arg(dest)
    }

    pub fn link(&self, dest: &str, target: &Path) -> Invocation {
        self.op("link").arg(dest).arg_path(target)
    }

    pub fn chmod(&self, mode: &str, path: &str) -> Invocation {
        self.op("chmod").arg(mode).arg(path)
    }

    pub fn extract(&self, path: &str, dest: &Path) -> Invocation {
        self.op("extract").arg(path).arg_path(dest)
    }

    pub fn remove(&self, path: &str) -> Invocation {
        self.op("rm").arg(path)
    }

    pub fn grow(&self, bytes: u64) -> Invocation {
        self.op("grow").arg(bytes.to_string())
    }
}

/// Counters and tolerated failures from one synthesis
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynthesisReport {
    pub directories_created: usize,
    pub files_added: usize,
    pub symlinks_added: usize,
    pub permissions_set: usize,
    pub tolerated: Vec<ToleratedFailure>,
}

impl SynthesisReport {
    /// Whether every primitive succeeded
    pub fn is_clean(&self) -> bool {
        self.tolerated.is_empty()
    }
}

/// Replicates a staging tree into an image
pub struct ImageSynthesizer<'a> {
    gateway: &'a dyn ToolGateway,
    image: HfsImage,
}

impl<'a> ImageSynthesizer<'a> {
    pub fn new(gateway: &'a dyn ToolGateway, image: &Path) -> Self {
        Self {
            gateway,
            image: HfsImage::new(image),
        }
    }

    /// Replicate `staging_root` into the image
    pub fn synthesize(&self, staging_root: &Path) -> Result<SynthesisReport, SynthesisError> {
        if !staging_root.is_dir() {
            return Err(SynthesisError::MissingStagingTree {
                path: staging_root.to_path_buf(),
            });
        }
        if !self.image.path().exists() {
            return Err(SynthesisError::MissingTargetImage {
                path: self.image.path().to_path_buf(),
            });
        }

        let entries = scan_staging_tree(staging_root);
        let mut report = SynthesisReport::default();
        self.directory_pass(&entries, &mut report);
        self.content_pass(&entries, &mut report);

        if !report.is_clean() {
            tracing::warn!(
                "{} image operation(s) failed during synthesis",
                report.tolerated.len()
            );
            for failure in &report.tolerated {
                tracing::debug!("  {}: {}", failure.command, failure.error);
            }
        }
        Ok(report)
    }

    /// Create every staged directory; existing ones fail harmlessly
    pub fn directory_pass(&self, entries: &[FilesystemEntry], report: &mut SynthesisReport) {
        for entry in entries.iter().filter(|e| e.kind == EntryKind::Directory) {
            if self.apply(&self.image.mkdir(&entry.relative_path), report) {
                report.directories_created += 1;
            }
        }
    }

    /// Place every file and symlink, then fix its mode
    pub fn content_pass(&self, entries: &[FilesystemEntry], report: &mut SynthesisReport) {
        for entry in entries.iter().filter(|e| e.kind != EntryKind::Directory) {
            match (&entry.kind, &entry.symlink_target) {
                (EntryKind::Symlink, Some(target)) => {
                    if self.apply(&self.image.link(&entry.relative_path, target), report) {
                        report.symlinks_added += 1;
                    }
                }
                _ => {
                    if self.apply(&self.image.add(&entry.source, &entry.relative_path), report) {
                        report.files_added += 1;
                    }
                }
            }

            let mode = entry.effective_mode();
            if self.apply(&self.image.chmod(&mode.chmod_arg(), &entry.relative_path), report) {
                report.permissions_set += 1;
            }
        }
    }

    fn apply(&self, invocation: &Invocation, report: &mut SynthesisReport) -> bool {
        let stage = Stage::new(invocation.to_string(), invocation.clone()).tolerant();
        match stage::run_stage(self.gateway, &stage) {
            Ok(StageOutcome::Tolerated(failure)) => {
                report.tolerated.push(failure);
                false
            }
            Ok(outcome) => outcome.is_completed(),
            Err(e) => {
                tracing::warn!("{}", e);
                false
            }
        }
    }
}
