//! CLI smoke tests - verify basic command-line interface functionality
//!
//! These tests run the actual compiled binaries to ensure:
//! - Help and version flags work
//! - The one-command-at-a-time rule is enforced
//! - Error messages are helpful

use std::process::Command;

/// Helper to get the path to the compiled pwpatch binary
fn pwpatch_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pwpatch"))
}

fn pwpatchd_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pwpatchd"))
}

#[test]
fn cli_help_works() {
    let output = pwpatch_bin()
        .arg("--help")
        .output()
        .expect("Failed to run pwpatch --help");

    assert!(
        output.status.success(),
        "pwpatch --help should exit successfully"
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "Help should show usage");
    assert!(stdout.contains("--link"), "Help should list link command");
    assert!(
        stdout.contains("--search"),
        "Help should list search command"
    );
    assert!(
        stdout.contains("--sample"),
        "Help should list sample command"
    );
}

#[test]
fn cli_version_works() {
    let output = pwpatch_bin()
        .arg("--version")
        .output()
        .expect("Failed to run pwpatch --version");

    assert!(
        output.status.success(),
        "pwpatch --version should exit successfully"
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("pwpatch"), "Version should mention pwpatch");
}

#[test]
fn cli_requires_exactly_one_command() {
    let output = pwpatch_bin()
        .output()
        .expect("Failed to run pwpatch with no args");

    assert!(
        !output.status.success(),
        "No command should fail with a usage error"
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Usage") || stderr.contains("required"),
        "Should print usage when no command is given: {stderr}"
    );
}

#[test]
fn cli_rejects_two_commands() {
    let output = pwpatch_bin()
        .args(["--search", "x", "--sample", "256"])
        .output()
        .expect("Failed to run pwpatch with two commands");

    assert!(
        !output.status.success(),
        "Two commands at once should fail with a usage error"
    );
}

#[test]
fn cli_link_requires_two_values() {
    let output = pwpatch_bin()
        .args(["--link", "only-one"])
        .output()
        .expect("Failed to run pwpatch --link with one value");

    assert!(
        !output.status.success(),
        "--link with one value should fail"
    );
}

#[test]
fn daemon_help_lists_modes() {
    let output = pwpatchd_bin()
        .arg("--help")
        .output()
        .expect("Failed to run pwpatchd --help");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in ["--show", "--auto", "--kill", "--interval"] {
        assert!(stdout.contains(flag), "Help should list {flag}");
    }
}

#[test]
fn daemon_kill_conflicts_with_auto() {
    let output = pwpatchd_bin()
        .args(["--kill", "--auto"])
        .output()
        .expect("Failed to run pwpatchd --kill --auto");

    assert!(
        !output.status.success(),
        "--kill and --auto should conflict"
    );
}
