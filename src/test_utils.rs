//! Test utilities
//!
//! A recording [`ToolGateway`] and proptest generators shared by unit tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use crate::error::ToolError;
use crate::infra::process::{Invocation, ToolGateway, ToolOutput};

type Matcher = Box<dyn Fn(&Invocation) -> bool>;

/// Gateway that records invocations instead of running them
///
/// Successful invocations create empty placeholder files for their outputs
/// (`-o <path>`, `extract <src> <dest>`, `cp <src> <dest>`) so that later
/// existence checks behave as with the real tools.
#[derive(Default)]
pub struct FakeGateway {
    calls: RefCell<Vec<Invocation>>,
    failures: Vec<Matcher>,
    stdout: HashMap<String, Vec<u8>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every invocation of `program` exits non-zero
    #[must_use]
    pub fn fail_program(self, program: &str) -> Self {
        let program = program.to_string();
        self.fail_when(move |inv| inv.program() == program)
    }

    /// Invocations matching `matcher` exit non-zero
    #[must_use]
    pub fn fail_when(mut self, matcher: impl Fn(&Invocation) -> bool + 'static) -> Self {
        self.failures.push(Box::new(matcher));
        self
    }

    /// `program` prints `bytes` on stdout
    #[must_use]
    pub fn with_stdout(mut self, program: &str, bytes: &[u8]) -> Self {
        self.stdout.insert(program.to_string(), bytes.to_vec());
        self
    }

    /// Recorded invocations
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    /// Recorded program names
    pub fn programs(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|c| c.program().to_string())
            .collect()
    }

    /// Recorded invocations rendered as command lines
    pub fn command_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(ToString::to_string).collect()
    }
}

fn touch(path: &str) {
    let path = Path::new(path);
    if path.exists() {
        return;
    }
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(path, b"");
}

fn simulate_outputs(invocation: &Invocation) {
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
}

impl ToolGateway for FakeGateway {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        self.calls.borrow_mut().push(invocation.clone());

        if self.failures.iter().any(|m| m(invocation)) {
            return Err(ToolError::NonZeroExit {
                command: invocation.to_string(),
                code: 1,
                stderr: String::new(),
            });
        }

        simulate_outputs(invocation);
        Ok(ToolOutput {
            stdout: self
                .stdout
                .get(invocation.program())
                .cloned()
                .unwrap_or_default(),
            stderr: String::new(),
        })
    }
}

pub mod generators {
    use proptest::prelude::*;

    /// Generate a permission mode with optional setuid/setgid/sticky bits
    pub fn file_mode() -> impl Strategy<Value = u32> {
        (0u32..8, 0u32..0o1000).prop_map(|(special, perms)| (special << 9) | perms)
    }

    /// Generate a board config like `d321ap`
    pub fn board_config() -> impl Strategy<Value = String> {
        "[a-z][0-9]{2,3}[a-z]{0,2}ap"
    }
}

pub mod fixtures {
    use std::collections::BTreeSet;
    use std::fs::File;
    use std::io::Write;
    use std::path::Path;

    use zip::write::SimpleFileOptions;

    /// Builds a firmware bundle: a zip holding a manifest and empty components
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
        #[must_use]
        pub fn identity(mut self, board: &str, components: &[(&str, &str)]) -> Self {
            let components = components
                .iter()
                .map(|(name, path)| ((*name).to_string(), (*path).to_string()))
                .collect();
            self.identities.push((board.to_string(), components));
            self
        }

        #[must_use]
        pub fn build_version(mut self, version: &str) -> Self {
            self.build_version = Some(version.to_string());
            self
        }

        /// Manifest as an XML property list
        pub fn manifest_xml(&self) -> String {
            let identities: String = self
                .identities
                .iter()
                .map(|(board, components)| {
                    let body: String = components
                        .iter()
                        .map(|(name, path)| {
                            format!(
                                "<key>{name}</key><dict><key>Info</key><dict>\
                                 <key>Path</key><string>{path}</string></dict></dict>"
                            )
                        })
                        .collect();
                    format!(
                        "<dict><key>Info</key><dict><key>DeviceClass</key>\
                         <string>{board}</string></dict>\
                         <key>Manifest</key><dict>{body}</dict></dict>"
                    )
                })
                .collect();
            let version = self
                .build_version
                .as_ref()
                .map(|v| format!("<key>ProductBuildVersion</key><string>{v}</string>"))
                .unwrap_or_default();
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
                 <plist version=\"1.0\"><dict><key>BuildIdentities</key>\
                 <array>{identities}</array>{version}</dict></plist>"
            )
        }

        /// Write the bundle to `path`
        pub fn write(&self, path: &Path) {
            let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
            writer
                .start_file("BuildManifest.plist", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(self.manifest_xml().as_bytes()).unwrap();
            let paths: BTreeSet<&str> = self
                .identities
                .iter()
                .flat_map(|(_, components)| components.iter().map(|(_, path)| path.as_str()))
                .collect();
            for path in paths {
                writer.start_file(path, SimpleFileOptions::default()).unwrap();
                writer.write_all(b"payload").unwrap();
            }
            writer.finish().unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fake_gateway_records_and_fails() {
        let gateway = FakeGateway::new().fail_program("false");
        assert!(gateway.run(&Invocation::new("true")).is_ok());
        assert!(gateway.run(&Invocation::new("false")).is_err());
        assert_eq!(gateway.programs(), vec!["true", "false"]);
    }

    #[test]
    fn test_fake_gateway_touches_outputs() {
        let temp = tempfile::TempDir::new().unwrap();
        let out = temp.path().join("ramdisk.dmg");
        let gateway = FakeGateway::new();
        gateway
            .run(&Invocation::new("img4").arg("-o").arg_path(&out))
            .unwrap();
        assert!(out.exists());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_file_mode_generator(mode in file_mode()) {
            prop_assert!(mode <= 0o7777);
        }

        #[test]
        fn test_board_config_generator(board in board_config()) {
            prop_assert!(board.ends_with("ap"));
        }
    }
}
