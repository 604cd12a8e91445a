//! Integration tests for the txt2utf8 binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn txt2utf8() -> Command {
    Command::cargo_bin("txt2utf8").unwrap()
}

#[test]
fn test_converts_directory() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    fs::write(input.path().join("a.txt"), "hello\n").unwrap();
    fs::write(input.path().join("b.txt"), "world\n").unwrap();

    txt2utf8()
        .arg("-i")
        .arg(input.path())
        .arg("-o")
        .arg(output.path())
        .arg("--no-progress")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 ok, 0 skipped, 0 failed of 2 files"));

    assert_eq!(fs::read_to_string(output.path().join("a.txt")).unwrap(), "hello\n");
}

#[test]
fn test_partial_failure_exit_code() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    fs::write(input.path().join("good.txt"), "fine\n").unwrap();
    fs::write(input.path().join("bad.txt"), b"\0binary\0").unwrap();

    txt2utf8()
        .arg("-i")
        .arg(input.path())
        .arg("-o")
        .arg(output.path())
        .arg("--no-progress")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("bad.txt"));
}

#[test]
fn test_missing_input_is_fatal() {
    let dir = tempdir().unwrap();

    txt2utf8()
        .arg("-i")
        .arg(dir.path().join("nowhere"))
        .arg("-o")
        .arg(dir.path().join("out"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Input not found"));
}

#[test]
fn test_invalid_worker_count_is_fatal() {
    let input = tempdir().unwrap();
    fs::write(input.path().join("a.txt"), "x").unwrap();

    txt2utf8()
        .arg("-i")
        .arg(input.path())
        .arg("-o")
        .arg(input.path().join("out"))
        .args(["--workers", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid worker count"));
}

#[test]
fn test_unknown_fallback_is_fatal() {
    let input = tempdir().unwrap();
    fs::write(input.path().join("a.txt"), "x").unwrap();

    txt2utf8()
        .arg("-i")
        .arg(input.path())
        .arg("-o")
        .arg(input.path().join("out"))
        .args(["--fallback", "utf-8,klingon"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("klingon"));
}

#[test]
fn test_writes_json_report() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    fs::write(input.path().join("a.log"), b"caf\xE9 cr\xE8me br\xFBl\xE9e\n").unwrap();
    let report_path = output.path().join("reports/run.json");

    txt2utf8()
        .arg("-i")
        .arg(input.path())
        .arg("-o")
        .arg(output.path().join("converted"))
        .args(["-e", "log", "--quiet", "--report"])
        .arg(&report_path)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(json["total"], 1);
    assert_eq!(json["complete"], true);
    assert_eq!(json["succeeded"][0]["status"], "success");
}
