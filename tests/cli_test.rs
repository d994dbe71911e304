//! Integration tests for the command-line surface
//!
//! Runs the built binary against fixtures that fail before any external
//! program would be needed.

mod common;

use common::{BundleBuilder, TestProject};
use std::os::unix::fs::PermissionsExt;
use std::process::{Command, Output};

/// Run sunstorm with an isolated config dir, install root and PATH
fn run_sunstorm(project: &TestProject, args: &[&str]) -> Output {
    let empty_path = project.create_dir("empty-path");
    Command::new(env!("CARGO_BIN_EXE_sunstorm"))
        .current_dir(project.path())
        .env("SUNSTORM_CONFIG_DIR", project.path().join("config"))
        .env("SUNSTORM_ROOT", project.path().join("root"))
        .env("PATH", empty_path)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute sunstorm")
}

/// Install no-op stand-ins for every external program under `root/bin`
fn install_stub_tools(project: &TestProject) {
    let bin = project.create_dir("root/bin");
    for tool in [
        "futurerestore",
        "img4tool",
        "img4",
        "Kernel64Patcher",
        "iBoot64Patcher",
        "ldid",
        "asr64_patcher",
        "restored_external64_patcher",
        "tar",
        "python3",
        "hfsplus",
        "hdiutil",
        "chmod",
        "cp",
    ] {
        let path = bin.join(tool);
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_missing_ipsw_is_fatal() {
    let project = TestProject::new();
    project.create_file("blob.shsh2", "ticket");

    let output = run_sunstorm(
        &project,
        &["-r", "-i", "missing.ipsw", "-t", "blob.shsh2", "-d", "d321ap"],
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr(&output);
    assert!(
        stderr.contains("[!] Error: IPSW \"missing.ipsw\" doesn't exist"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn test_missing_blob_is_fatal() {
    let project = TestProject::new();
    project.create_file("fw.ipsw", "zip");

    let output = run_sunstorm(
        &project,
        &["-r", "-i", "fw.ipsw", "-t", "missing.shsh2", "-d", "d321ap"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Blob \"missing.shsh2\" doesn't exist"));
}

#[test]
fn test_boot_requires_identifier() {
    let project = TestProject::new();
    project.create_file("fw.ipsw", "zip");
    project.create_file("blob.shsh2", "ticket");

    let output = run_sunstorm(
        &project,
        &["-b", "-i", "fw.ipsw", "-t", "blob.shsh2", "-d", "d101ap"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("You need to specify an identifier (--identifier)"));
}

#[test]
fn test_extra_ramdisk_must_be_tar_gz() {
    let project = TestProject::new();
    project.create_file("fw.ipsw", "zip");
    project.create_file("blob.shsh2", "ticket");
    project.create_file("extra.zip", "");

    let output = run_sunstorm(
        &project,
        &[
            "-r",
            "-i",
            "fw.ipsw",
            "-t",
            "blob.shsh2",
            "-d",
            "d321ap",
            "--extra-ramdisk",
            "extra.zip",
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Extra ramdisk must be in the $file.tar.gz format"));
}

#[test]
fn test_missing_program_is_fatal() {
    let project = TestProject::new();
    project.create_file("fw.ipsw", "zip");
    project.create_file("blob.shsh2", "ticket");

    let output = run_sunstorm(
        &project,
        &["-r", "-i", "fw.ipsw", "-t", "blob.shsh2", "-d", "d321ap"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("\"futurerestore\" not found, please install it."));
}

#[test]
fn test_malformed_config_is_fatal() {
    let project = TestProject::new();
    project.create_file("fw.ipsw", "zip");
    project.create_file("blob.shsh2", "ticket");
    project.create_file("config/config.toml", "[keys\nurl =");

    let output = run_sunstorm(
        &project,
        &["-r", "-i", "fw.ipsw", "-t", "blob.shsh2", "-d", "d321ap"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Failed to parse config file"));
}

#[test]
fn test_boot_and_restore_conflict() {
    let project = TestProject::new();

    let output = run_sunstorm(
        &project,
        &["-b", "-r", "-i", "fw.ipsw", "-t", "blob.shsh2", "-d", "d321ap"],
    );

    assert!(!output.status.success());
    assert!(stderr(&output).contains("cannot be used with"));
}

#[test]
fn test_version_flag() {
    let project = TestProject::new();

    let output = run_sunstorm(&project, &["--version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with(&format!("sunstorm {}", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn test_quiet_restore_still_prints_command() {
    let project = TestProject::new();
    install_stub_tools(&project);
    BundleBuilder::new()
        .identity(
            "d321ap",
            &[
                ("RestoreRamDisk", "090-1111-100.dmg"),
                ("RestoreKernelCache", "kernelcache.release.d321"),
            ],
        )
        .build_version("18A373")
        .write(&project.path().join("fw.ipsw"));
    project.create_file("blob.shsh2", "ticket");

    let output = run_sunstorm(
        &project,
        &["-q", "-r", "-i", "fw.ipsw", "-t", "blob.shsh2", "-d", "d321ap"],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("[*] Info:"), "unexpected stdout: {stdout}");
    assert!(
        stdout.lines().any(|l| l.starts_with("futurerestore -t ")),
        "unexpected stdout: {stdout}"
    );
}
