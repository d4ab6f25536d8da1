//! CLI smoke tests for stratus.
//!
//! These tests verify that the CLI parses its commands and fails cleanly when
//! run outside a built project.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the stratus binary, isolated from the caller's environment.
fn stratus_cmd(dir: &TempDir) -> Command {
  let mut cmd = cargo_bin_cmd!("stratus");
  cmd.current_dir(dir.path());
  cmd.env_remove("STRATUS_CONFIG");
  cmd
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  let temp = TempDir::new().unwrap();
  stratus_cmd(&temp)
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  let temp = TempDir::new().unwrap();
  stratus_cmd(&temp)
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("stratus"));
}

#[test]
fn subcommand_help_works() {
  let temp = TempDir::new().unwrap();
  for cmd in &["build", "package", "plan", "synth", "sync", "info"] {
    stratus_cmd(&temp)
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

// =============================================================================
// info
// =============================================================================

#[test]
fn info_without_config_uses_defaults() {
  let temp = TempDir::new().unwrap();
  stratus_cmd(&temp)
    .arg("info")
    .assert()
    .success()
    .stdout(predicate::str::contains("Config: (defaults)"))
    .stdout(predicate::str::contains("Assets prefix: /_assets"));
}

#[test]
fn info_reads_config_from_env() {
  let temp = TempDir::new().unwrap();
  let path = temp.path().join("custom.toml");
  std::fs::write(&path, "assets_prefix = \"/files\"\n").unwrap();

  stratus_cmd(&temp)
    .env("STRATUS_CONFIG", &path)
    .arg("info")
    .assert()
    .success()
    .stdout(predicate::str::contains("custom.toml"))
    .stdout(predicate::str::contains("Assets prefix: /files"));
}

// =============================================================================
// Error Handling
// =============================================================================

#[test]
fn missing_explicit_config_fails() {
  let temp = TempDir::new().unwrap();
  stratus_cmd(&temp)
    .args(["--config", "nope.toml", "info"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("nope.toml"));
}

#[test]
fn unknown_config_key_fails() {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("stratus.toml"), "no_such_key = true\n").unwrap();

  stratus_cmd(&temp).arg("info").assert().failure();
}

#[test]
fn build_missing_input_fails() {
  let temp = TempDir::new().unwrap();
  stratus_cmd(&temp)
    .args(["build", "--input", "generator.json"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("generator.json"));
}

#[test]
fn sync_requires_store() {
  let temp = TempDir::new().unwrap();
  stratus_cmd(&temp).arg("sync").assert().failure();
}
