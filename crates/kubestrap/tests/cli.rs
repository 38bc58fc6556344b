use std::fs;

use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use tempfile::TempDir;

fn config_file(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, contents).expect("failed to write config");
    path
}

#[test]
fn help_lists_subcommands() {
    assert_cmd::cargo::cargo_bin_cmd!("kubestrap")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("install-master"))
        .stdout(contains("join"))
        .stdout(contains("reset"));
}

#[test]
fn join_requires_credentials() {
    assert_cmd::cargo::cargo_bin_cmd!("kubestrap")
        .args(["join", "--api-server", "10.0.0.1:6443"])
        .assert()
        .failure()
        .stderr(contains("--token"));
}

#[test]
fn unknown_cni_is_rejected() {
    assert_cmd::cargo::cargo_bin_cmd!("kubestrap")
        .args(["install-master", "--cni", "weave"])
        .assert()
        .failure()
        .stderr(contains("weave"));
}

#[test]
fn invalid_config_reports_cause_chain() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let config = config_file(&dir, "[cluster]\ncni = \"flannel\"\nbogus = 1\n");

    assert_cmd::cargo::cargo_bin_cmd!("kubestrap")
        .arg("--config")
        .arg(&config)
        .arg("reset")
        .assert()
        .code(1)
        .stderr(contains("error: invalid configuration"))
        .stderr(contains("caused by:"));
}

#[test]
fn unknown_package_manager_in_config_fails() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let config = config_file(&dir, "[runtime]\npackage_manager = \"pacman\"\n");

    assert_cmd::cargo::cargo_bin_cmd!("kubestrap")
        .arg("--config")
        .arg(&config)
        .arg("reset")
        .assert()
        .code(1)
        .stderr(contains("pacman"));
}

#[test]
fn reset_without_terminal_declines_and_exits_zero() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let config = config_file(&dir, "[runtime]\npackage_manager = \"apt\"\n");
    let log_dir = dir.path().join("logs");

    assert_cmd::cargo::cargo_bin_cmd!("kubestrap")
        .env("KUBESTRAP_NO_TTY", "1")
        .arg("--config")
        .arg(&config)
        .arg("--log-dir")
        .arg(&log_dir)
        .arg("reset")
        .assert()
        .success()
        .stdout(contains("Aborted by user; no changes were made."))
        .stdout(contains("Audit log:").not());

    assert!(!log_dir.exists());
}

#[test]
fn declined_reset_skips_setup_that_would_fail() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "").expect("failed to write blocker file");
    let config = config_file(&dir, "");

    assert_cmd::cargo::cargo_bin_cmd!("kubestrap")
        .env("KUBESTRAP_NO_TTY", "1")
        .env("PATH", dir.path())
        .arg("--config")
        .arg(&config)
        .arg("--log-dir")
        .arg(blocker.join("logs"))
        .arg("reset")
        .assert()
        .success()
        .stdout(contains("Aborted by user; no changes were made."))
        .stderr(contains("error:").not());
}
