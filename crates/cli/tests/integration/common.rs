//! Shared test helpers for CLI integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Get path to a fixture file or directory.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

fn copy_tree(from: &Path, to: &Path) {
  fs::create_dir_all(to).unwrap();
  for entry in fs::read_dir(from).unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", from.display(), e)) {
    let entry = entry.unwrap();
    let target = to.join(entry.file_name());
    if entry.file_type().unwrap().is_dir() {
      copy_tree(&entry.path(), &target);
    } else {
      fs::copy(entry.path(), &target).unwrap();
    }
  }
}

/// Isolated test environment.
///
/// Each test gets its own copy of a generator site in a temporary directory;
/// commands run with that directory as their working directory.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// Create from a fixture site directory.
  pub fn from_fixture(name: &str) -> Self {
    let temp = TempDir::new().unwrap();
    copy_tree(&fixture_path(name), temp.path());
    Self { temp }
  }

  /// The fixture site used by most tests.
  pub fn site() -> Self {
    Self::from_fixture("site")
  }

  pub fn root(&self) -> PathBuf {
    let p = self.temp.path().to_path_buf();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// Write a file relative to the site root.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
  }

  pub fn out_dir(&self) -> PathBuf {
    self.root().join(".stratus")
  }

  pub fn store_dir(&self) -> PathBuf {
    self.root().join("store")
  }

  pub fn read_json(&self, relative_path: &str) -> serde_json::Value {
    let content = fs::read_to_string(self.root().join(relative_path)).unwrap();
    serde_json::from_str(&content).unwrap()
  }

  /// Get a pre-configured Command for the stratus binary.
  ///
  /// Runs in the site root with `STRATUS_CONFIG` and `RUST_LOG` cleared so
  /// the caller's environment cannot leak into the test.
  pub fn stratus_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("stratus");
    cmd.current_dir(self.root());
    cmd.env_remove("STRATUS_CONFIG");
    cmd.env_remove("RUST_LOG");
    cmd
  }

  /// Run `stratus build` against the fixture's generator output.
  pub fn build(&self) {
    self
      .stratus_cmd()
      .args(["build", "--input", "generator.json"])
      .assert()
      .success();
  }
}
