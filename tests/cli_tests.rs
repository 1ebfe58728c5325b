//! CLI integration tests for the `deepreach` binary.
//!
//! These tests exercise the command-line interface using `assert_cmd`, which
//! spawns the compiled binary as a subprocess and asserts on exit code,
//! stdout, and stderr. Help and argument-validation tests verify the `clap`
//! parser; the end-to-end tests run real (small-exponent) tests against a
//! tempdir save path with the CPU reference squarer.
//!
//! # How to run
//!
//! ```bash
//! cargo test --test cli_tests
//! ```

use assert_cmd::Command;
use predicates::prelude::*;

/// Constructs a `Command` targeting the compiled `deepreach` binary.
fn deepreach() -> Command {
    Command::cargo_bin("deepreach").expect("binary should be built")
}

// ── Help and argument validation ────────────────────────────────────────

#[test]
fn help_lists_subcommands() {
    deepreach()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("prp"))
        .stdout(predicate::str::contains("ll"))
        .stdout(predicate::str::contains("proof"));
}

#[test]
fn prp_requires_an_exponent() {
    deepreach().arg("prp").assert().failure();
}

#[test]
fn rejects_unknown_subcommand() {
    deepreach().arg("factorize").assert().failure();
}

#[test]
fn proof_requires_power() {
    let dir = tempfile::tempdir().unwrap();
    deepreach()
        .args(["--save-path"])
        .arg(dir.path())
        .args(["proof", "127"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--power"));
}

// ── End-to-end runs ─────────────────────────────────────────────────────

#[test]
fn prp_run_reports_probable_prime_for_m127() {
    let dir = tempfile::tempdir().unwrap();
    deepreach()
        .args(["--save-path"])
        .arg(dir.path())
        .args(["--power", "2", "prp", "127"])
        .assert()
        .success()
        .stdout(predicate::str::contains("probable prime"))
        .stdout(predicate::str::contains("proof: power 2"));
    assert!(dir.path().join("results.txt").exists());
}

#[test]
fn prp_run_reports_composite_for_m29() {
    let dir = tempfile::tempdir().unwrap();
    deepreach()
        .args(["--save-path"])
        .arg(dir.path())
        .args(["--power", "2", "prp", "29"])
        .assert()
        .success()
        .stdout(predicate::str::contains("composite"));
}

#[test]
fn ll_run_detects_m13() {
    let dir = tempfile::tempdir().unwrap();
    deepreach()
        .args(["--save-path"])
        .arg(dir.path())
        .args(["ll", "13"])
        .assert()
        .success()
        .stdout(predicate::str::contains("probable prime"));
}

#[test]
fn proof_subcommand_rebuilds_from_a_finished_run() {
    let dir = tempfile::tempdir().unwrap();
    deepreach()
        .args(["--save-path"])
        .arg(dir.path())
        .args(["--power", "3", "prp", "127"])
        .assert()
        .success();

    deepreach()
        .args(["--save-path"])
        .arg(dir.path())
        .args(["proof", "127", "--power", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rebuilt and verified"));
}

#[test]
fn proof_subcommand_fails_without_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    deepreach()
        .args(["--save-path"])
        .arg(dir.path())
        .args(["proof", "127", "--power", "3"])
        .assert()
        .failure();
}
