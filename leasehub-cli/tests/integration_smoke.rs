//! Smoke tests for the leasehub binary

use assert_cmd::Command;
use predicates::prelude::*;

fn leasehub() -> Command {
    Command::cargo_bin("leasehub").expect("binary built")
}

#[test]
fn help_lists_subcommands() {
    leasehub()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("inspect-sheet"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn bash_completions_are_generated() {
    leasehub()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("leasehub"));
}

#[test]
fn inspect_missing_file_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("nope.xlsx");
    leasehub()
        .arg("inspect-sheet")
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn inspect_rejects_non_xlsx() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("notes.xlsx");
    std::fs::write(&path, "not a workbook").expect("write");
    leasehub()
        .arg("inspect-sheet")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse"));
}

#[test]
fn serve_without_api_key_fails_fast() {
    leasehub()
        .env_remove("API_AUTH_KEY")
        .env("MONGODB_URI", "mongodb://127.0.0.1:1")
        .current_dir(tempfile::tempdir().expect("tempdir").path())
        .args(["serve", "--skip-indexes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API_AUTH_KEY"));
}
