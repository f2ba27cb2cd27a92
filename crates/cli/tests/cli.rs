//! End-to-end tests for the `nbsup` binary.

#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn nbsup() -> Command {
    let mut cmd = Command::cargo_bin("nbsup").expect("nbsup binary");
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_launch_ready_command_completes() {
    nbsup()
        .args(["launch", "--timeout", "10", "--", "sh", "-c", "echo INTERPRETER_READY; sleep 1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ready:"))
        .stdout(predicate::str::contains("COMPLETED"));
}

#[test]
fn test_launch_timeout_exits_124() {
    nbsup()
        .args(["launch", "--timeout", "1", "--", "sh", "-c", "exec sleep 30"])
        .assert()
        .code(124)
        .stdout(predicate::str::contains("TERMINATED"))
        .stdout(predicate::str::contains("gone on timeout"));
}

#[test]
fn test_launch_missing_program_exits_127_as_json() {
    let output = nbsup()
        .args(["launch", "--json", "--", "nbsup-test-no-such-program"])
        .output()
        .expect("run nbsup");

    assert_eq!(output.status.code(), Some(127));
    let outcome: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("JSON outcome");
    assert_eq!(outcome["ready"], false);
    assert_eq!(outcome["state"], "TERMINATED");
    assert_eq!(outcome["exitCode"], 127);
    assert_eq!(outcome["failures"].as_array().map(Vec::len), Some(1));
}

#[test]
fn test_launch_custom_marker_and_env() {
    nbsup()
        .args([
            "launch",
            "--ready-marker",
            "UP",
            "--env",
            "NAME=kernel",
            "--",
            "sh",
            "-c",
            "echo \"$NAME UP\"; sleep 1; exit 2",
        ])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Ready:"));
}

#[test]
fn test_launch_rejects_bad_env() {
    nbsup()
        .args(["launch", "--env", "NOVALUE", "--", "sh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected KEY=VALUE"));
}

#[test]
fn test_check_reports_configuration() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config_dir = dir.path().join(".notebook");
    fs::create_dir_all(config_dir.join("interpreters")).expect("interpreters dir");
    fs::write(
        config_dir.join("interpreters/shell.yaml"),
        "name: shell\ncommand: sh\n",
    )
    .expect("interpreter file");

    nbsup()
        .args(["check", "--root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Interpreters (1)"))
        .stdout(predicate::str::contains("shell"));
}

#[test]
fn test_start_configured_interpreter() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config_dir = dir.path().join(".notebook");
    fs::create_dir_all(config_dir.join("interpreters")).expect("interpreters dir");
    fs::write(
        config_dir.join("interpreters/shell.yaml"),
        "name: shell\ncommand: sh\nargs: [\"-c\", \"echo INTERPRETER_READY; exec sleep 30\"]\n",
    )
    .expect("interpreter file");

    nbsup()
        .args(["start", "shell", "--root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("is ready"));
}

#[test]
fn test_start_unknown_interpreter_fails() {
    let dir = tempfile::tempdir().expect("temp dir");

    nbsup()
        .args(["start", "missing", "--root"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not configured"));
}
