//! Exercises the `tsl` binary end to end via `std::process::Command`.

use std::path::PathBuf;
use std::process::Command;

fn tsl() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tsl"))
}

/// Writes `contents` to a `.tsl` file inside a fresh temp dir, returning the
/// dir (kept alive for the file's lifetime) and the file's path.
fn script_file(contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("script.tsl");
    std::fs::write(&path, contents).expect("write temp script");
    (dir, path)
}

#[test]
fn version_flag_exits_zero() {
    let output = tsl().arg("-v").output().expect("spawn tsl");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("tsl "));
}

#[test]
fn missing_file_argument_exits_one() {
    let output = tsl().output().expect("spawn tsl");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn successful_script_exits_zero() {
    let (_dir, path) = script_file("var sum = 0; for i in 0..=5 { sum = sum + i } sum");
    let output = tsl().arg("--no-watch").arg(&path).output().expect("spawn tsl");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn runtime_error_prints_error_prefix_and_exits_one() {
    let (_dir, path) = script_file(r#"var x: integer = "hello""#);
    let output = tsl().arg("--no-watch").arg(&path).output().expect("spawn tsl");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("ERROR: "));
    assert!(stderr.contains("type mismatch: expected integer, got string"));
}

#[test]
fn parse_error_is_prefixed_with_location() {
    let (_dir, path) = script_file("var x = ;");
    let output = tsl().arg("--no-watch").arg(&path).output().expect("spawn tsl");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.lines().next().unwrap().starts_with("parse error at"));
}

#[test]
fn missing_script_file_is_an_io_error() {
    let output = tsl().arg("--no-watch").arg("/no/such/file.tsl").output().expect("spawn tsl");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("ERROR: "));
}
