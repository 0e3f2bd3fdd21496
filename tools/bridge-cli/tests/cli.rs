//! End-to-end checks of the dispatcher contract.
//!
//! The binary is built without the `python` feature here, so the scripting
//! API is always unavailable; operations that fail before touching it are
//! exercised against the real filesystem.

use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::Value;

/// The bridge binary with an isolated documents and config directory.
#[allow(deprecated)]
fn bridge(docs: &Path) -> Command {
    let mut cmd = Command::cargo_bin("resolve-bridge").unwrap();
    cmd.env("RESOLVE_BRIDGE_DOCUMENTS_DIR", docs)
        .env("XDG_CONFIG_HOME", docs.join("config"))
        .env_remove("RUST_LOG");
    cmd
}

fn single_json_line(stdout: &[u8]) -> Value {
    let text = String::from_utf8(stdout.to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1, "stdout: {text:?}");
    serde_json::from_str(lines[0]).unwrap()
}

#[test]
fn missing_function_exits_non_zero() {
    let docs = tempfile::tempdir().unwrap();
    bridge(docs.path())
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::diff(
            "{\"ok\":false,\"error\":\"No function specified\"}\n",
        ));
}

#[test]
fn unknown_function_exits_non_zero() {
    let docs = tempfile::tempdir().unwrap();
    bridge(docs.path())
        .arg("renderEverything")
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            r#"{"ok":false,"error":"Unknown function: renderEverything"}"#,
        ));
}

#[test]
fn reveal_missing_file_reports_not_found() {
    let docs = tempfile::tempdir().unwrap();
    let output = bridge(docs.path())
        .args(["revealFile", r#"{"path":"/no/such/render.mp4"}"#])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let response = single_json_line(&output);
    assert_eq!(response["ok"], false);
    assert_eq!(response["error"], "File not found");
}

#[test]
fn diagnostics_without_resolve_explains_why() {
    let docs = tempfile::tempdir().unwrap();
    let output = bridge(docs.path())
        .arg("diagInOut")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let response = single_json_line(&output);
    assert_eq!(
        response["error"],
        "Resolve API not initialized. Make sure DaVinci Resolve is running."
    );
}

#[test]
fn project_dir_without_resolve_explains_why() {
    let docs = tempfile::tempdir().unwrap();
    bridge(docs.path())
        .args(["getProjectDir", "{}"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Resolve API not initialized"));
}

#[test]
fn export_without_timeline_is_an_operation_failure() {
    let docs = tempfile::tempdir().unwrap();
    let output = bridge(docs.path())
        .args(["exportInOutVideo", r#"{"codec":"h264"}"#])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(
        single_json_line(&output),
        serde_json::json!({"ok": false, "error": "No active timeline"})
    );
}

#[test]
fn malformed_payload_is_reported_with_exit_zero() {
    let docs = tempfile::tempdir().unwrap();
    let output = bridge(docs.path())
        .args(["importFileToBin", "{not json"])
        .assert()
        .code(0)
        .get_output()
        .stdout
        .clone();
    let response = single_json_line(&output);
    assert_eq!(response["ok"], false);
    assert!(response["error"].as_str().is_some_and(|e| !e.is_empty()));
}

#[test]
fn logs_stay_off_stdout_when_verbose() {
    let docs = tempfile::tempdir().unwrap();
    let output = bridge(docs.path())
        .args(["--verbose", "diagInOut"])
        .assert()
        .success()
        .get_output()
        .clone();
    single_json_line(&output.stdout);
    assert!(!output.stderr.is_empty());
}

#[test]
fn unrecognized_flag_is_an_unknown_function() {
    let docs = tempfile::tempdir().unwrap();
    for flag in ["--bogus", "-x", "--help"] {
        let output = bridge(docs.path())
            .arg(flag)
            .assert()
            .code(1)
            .get_output()
            .stdout
            .clone();
        assert_eq!(
            single_json_line(&output),
            serde_json::json!({"ok": false, "error": format!("Unknown function: {flag}")})
        );
    }
}

#[test]
fn trailing_arguments_are_ignored() {
    let docs = tempfile::tempdir().unwrap();
    let output = bridge(docs.path())
        .args(["diagInOut", "{}", "extra"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let response = single_json_line(&output);
    assert_eq!(response["ok"], false);
    assert!(response["error"]
        .as_str()
        .is_some_and(|e| e.starts_with("Resolve API not initialized")));
}
