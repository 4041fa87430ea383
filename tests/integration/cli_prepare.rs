#![allow(missing_docs)]

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

fn bridge_cmd() -> Command {
    let mut cmd = Command::cargo_bin("limbo-bridge").expect("binary");
    cmd.env_remove("LIMBO_BRIDGE_LOG");
    cmd
}

#[test]
fn prepares_statements_from_arguments() {
    let dir = TempDir::new().expect("tempdir");
    let db = dir.path().join("cli.db");

    let output = bridge_cmd()
        .arg(&db)
        .arg("CREATE TABLE t (x INTEGER)")
        .arg("SELECT 1")
        .output()
        .expect("run cli");

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(stdout.contains("prepared: CREATE TABLE t (x INTEGER)"), "{stdout}");
    assert!(stdout.contains("prepared: SELECT 1"), "{stdout}");
}

#[test]
fn reports_native_errors_as_json() {
    let output = bridge_cmd()
        .args(["sqlite::memory:", "SELEC 1", "--format", "json"])
        .output()
        .expect("run cli");

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let report: Value = serde_json::from_str(stdout.trim()).expect("json line");
    assert_eq!(report["status"], "error");
    assert_eq!(report["code"], 1);
    assert_eq!(report["kind"], "SQLITE_ERROR");
}

#[test]
fn rejects_unknown_options() {
    let output = bridge_cmd()
        .args([":memory:", "SELECT 1", "-o", "cache_pages=4"])
        .output()
        .expect("run cli");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("utf8");
    assert!(stderr.contains("unrecognized option 'cache_pages'"), "{stderr}");
}

#[test]
fn reads_statements_from_stdin() {
    let output = bridge_cmd()
        .args([":memory:", "-o", "busy_timeout=50"])
        .write_stdin("SELECT 1\n\nSELECT 2\n")
        .output()
        .expect("run cli");

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert_eq!(stdout.lines().count(), 2, "{stdout}");
}
