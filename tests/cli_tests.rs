//! Binary smoke tests for the dashtimer CLI.

use assert_cmd::Command;
use predicates::prelude::*;

fn dashtimer() -> Command {
    let mut cmd = Command::cargo_bin("dashtimer").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_subcommands() {
    dashtimer()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("daemon"));
}

#[test]
fn completions_are_generated() {
    dashtimer()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dashtimer"));
}

#[test]
fn status_without_daemon_fails() {
    let dir = tempfile::tempdir().unwrap();
    dashtimer()
        .env("DASHTIMER_HOME", dir.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("dashtimer daemon"));
}

#[test]
fn invalid_mode_is_rejected() {
    dashtimer()
        .args(["create", "a", "--mode", "nap"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nap"));
}

#[test]
fn daemon_rejects_invalid_volume() {
    let dir = tempfile::tempdir().unwrap();
    dashtimer()
        .env("DASHTIMER_HOME", dir.path())
        .args(["daemon", "--volume", "3.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("volume"));
}
