//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests: a temporary
//! workspace, a firmware bundle builder and a gateway that records
//! invocations instead of running them.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use sunstorm::error::ToolError;
use sunstorm::infra::process::{Invocation, ToolGateway, ToolOutput};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Test workspace context
///
/// Creates a temporary directory holding inputs and an output directory.
pub struct TestProject {
    /// Temporary directory for the test
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new workspace with an empty `out/` directory
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::create_dir_all(dir.path().join("out")).expect("Failed to create out dir");
        Self { dir }
    }

    /// Get the path to the workspace
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Where flows relocate their artifacts
    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    /// Create a file in the workspace
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Create a directory in the workspace
    pub fn create_dir(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(&path).expect("Failed to create directory");
        path
    }

    /// Entries left in the output directory
    pub fn output_entries(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.output_dir())
            .expect("Failed to list output dir")
            .map(|e| e.expect("Failed to read entry").path())
            .collect()
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a zip firmware bundle with a manifest and placeholder components
#[derive(Default)]
pub struct BundleBuilder {
    identities: Vec<(String, Vec<(String, String)>)>,
    build_version: Option<String>,
}

impl BundleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a build identity for `board`
    pub fn identity(mut self, board: &str, components: &[(&str, &str)]) -> Self {
        self.identities.push((
            board.to_string(),
            components
                .iter()
                .map(|(name, path)| ((*name).to_string(), (*path).to_string()))
                .collect(),
        ));
        self
    }

    pub fn build_version(mut self, version: &str) -> Self {
        self.build_version = Some(version.to_string());
        self
    }

    /// The manifest as an XML property list
    pub fn manifest_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \
             \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n\
             <plist version=\"1.0\">\n<dict>\n<key>BuildIdentities</key>\n<array>\n",
        );
        for (board, components) in &self.identities {
            xml.push_str("<dict>\n<key>Info</key>\n<dict>\n<key>DeviceClass</key>\n");
            xml.push_str(&format!("<string>{board}</string>\n"));
            xml.push_str("<key>RestoreBehavior</key>\n<string>Erase</string>\n</dict>\n");
            xml.push_str("<key>Manifest</key>\n<dict>\n");
            for (name, path) in components {
                xml.push_str(&format!(
                    "<key>{name}</key>\n<dict>\n<key>Info</key>\n<dict>\n\
                     <key>Path</key>\n<string>{path}</string>\n</dict>\n</dict>\n"
                ));
            }
            xml.push_str("</dict>\n</dict>\n");
        }
        xml.push_str("</array>\n");
        if let Some(version) = &self.build_version {
            xml.push_str(&format!(
                "<key>ProductBuildVersion</key>\n<string>{version}</string>\n"
            ));
        }
        xml.push_str("</dict>\n</plist>\n");
        xml
    }

    /// Write the bundle to `path`
    pub fn write(&self, path: &Path) -> PathBuf {
        let mut writer = zip::ZipWriter::new(File::create(path).expect("Failed to create bundle"));
        writer
            .start_file("BuildManifest.plist", SimpleFileOptions::default())
            .expect("Failed to start manifest");
        writer
            .write_all(self.manifest_xml().as_bytes())
            .expect("Failed to write manifest");

        let paths: BTreeSet<&str> = self
            .identities
            .iter()
            .flat_map(|(_, components)| components.iter().map(|(_, p)| p.as_str()))
            .collect();
        for component in paths {
            writer
                .start_file(component, SimpleFileOptions::default())
                .expect("Failed to start component");
            writer.write_all(b"payload").expect("Failed to write component");
        }
        writer.finish().expect("Failed to finish bundle");
        path.to_path_buf()
    }
}

/// Gateway that records invocations and fakes their outputs
///
/// Every `-o <path>` argument, `hfsplus ... extract <src> <dest>` and
/// `cp <src> <dest>` produces an empty file so later steps find their inputs.
#[derive(Default)]
pub struct RecordingGateway {
    calls: RefCell<Vec<Invocation>>,
    failing: Vec<String>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every invocation whose command line contains `needle` fails
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.failing.push(needle.to_string());
        self
    }

    /// Recorded command lines
    pub fn command_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(ToString::to_string).collect()
    }

    /// Recorded program names
    pub fn programs(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|c| c.program().to_string())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.borrow().is_empty()
    }
}

fn touch(path: &str) {
    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if !path.exists() {
        let _ = std::fs::write(path, b"");
    }
}

impl ToolGateway for RecordingGateway {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        self.calls.borrow_mut().push(invocation.clone());
        let line = invocation.to_string();

        if self.failing.iter().any(|needle| line.contains(needle.as_str())) {
            return Err(ToolError::NonZeroExit {
                command: line,
                code: 1,
                stderr: "simulated failure".to_string(),
            });
        }

        let args = invocation.arguments();
        if let Some(pos) = args.iter().position(|a| a == "-o") {
            if let Some(out) = args.get(pos + 1) {
                touch(out);
            }
        }
        match (invocation.program(), args) {
            ("hfsplus", [_, op, _, dest]) if op == "extract" => touch(dest),
            ("cp", [_, dest]) => touch(dest),
            _ => {}
        }

        Ok(ToolOutput::default())
    }
}
