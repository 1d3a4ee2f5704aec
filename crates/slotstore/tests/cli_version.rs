#![cfg(all(unix, feature = "cli"))]

use std::process::Command;

#[test]
fn version_prints_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_slotstore"))
        .arg("version")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("slotstore {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn extended_version_reports_protocol_and_defaults() {
    let output = Command::new(env!("CARGO_BIN_EXE_slotstore"))
        .args(["version", "--extended"])
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("relay_protocol: 1.0"));
    assert!(stdout.contains("capacity=1000, slot_width=256"));
}

#[test]
fn unknown_subcommand_is_usage_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_slotstore"))
        .arg("frobnicate")
        .output()
        .expect("binary should run");

    assert_eq!(output.status.code(), Some(2));
}
