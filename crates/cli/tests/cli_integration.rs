//! Integration tests for the logtail binary

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn logtail(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_logtail"))
        .args(args)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run logtail")
}

#[test]
fn test_help_lists_follow() {
    let tmp = TempDir::new().unwrap();
    let output = logtail(&["--help"], tmp.path());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("follow"));
}

#[test]
fn test_missing_config_file_fails() {
    let tmp = TempDir::new().unwrap();
    let output = logtail(
        &["--config", "missing.toml", "follow", "0.log"],
        tmp.path(),
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to read config file"), "{}", stderr);
}

#[test]
fn test_invalid_config_file_fails() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("bad.toml"), "[dedup]\ndebounce_ms = \"soon\"\n").unwrap();
    let output = logtail(&["--config", "bad.toml", "follow", "0.log"], tmp.path());

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid config file"), "{}", stderr);
}

#[test]
fn test_follow_in_missing_directory_fails() {
    let tmp = TempDir::new().unwrap();
    let output = logtail(&["follow", "no/such/dir/0.log"], tmp.path());

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to watch"), "{}", stderr);
}
