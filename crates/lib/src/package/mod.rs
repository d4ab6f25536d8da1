//! Function packaging.
//!
//! Each function becomes a self-contained directory:
//!
//! ```text
//! <out>/functions/<function-id>/
//! ├── index.js          bundled adapter + function code
//! ├── package.json      {"type": "commonjs"}
//! ├── Dockerfile        container targets only
//! └── .cache/...        generator runtime files kept on disk
//! ```
//!
//! Steps: copy the declared files, write the descriptor and adapter, bundle,
//! then delete everything not on the retain list. A failure at any step
//! removes the function directory so nothing half-built gets deployed.

mod bundler;
mod templates;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

pub use bundler::*;
pub use templates::*;

use crate::consts::FUNCTIONS_DIR;
use crate::route::FunctionDefinition;
use crate::util::fs::{copy_file, is_single_component, prune_empty_dirs, relative_to_root, to_url_path};
use crate::util::glob::{GlobError, GlobSet};

pub const ADAPTER_FILE: &str = "handler.js";
pub const BUNDLE_FILE: &str = "index.js";
pub const DESCRIPTOR_FILE: &str = "package.json";
pub const DOCKERFILE: &str = "Dockerfile";

#[derive(Debug, Error)]
pub enum PackageError {
  #[error("function id {0:?} must be a single path segment")]
  InvalidFunctionId(String),

  #[error("function {function_id}: entry point {path} does not exist")]
  MissingEntryPoint { function_id: String, path: PathBuf },

  #[error("function {function_id}: {path} is outside the source root")]
  OutsideSourceRoot { function_id: String, path: PathBuf },

  #[error("I/O error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to start bundler {program}: {source}")]
  BundleSpawn {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("bundler failed for {function_id} (exit code {code:?}): {stderr}")]
  BundleFailed {
    function_id: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("bundler produced no index.js for {function_id}")]
  BundleOutputMissing { function_id: String },

  #[error("invalid retain pattern: {0}")]
  Retain(#[from] GlobError),

  #[error("packaging task failed: {0}")]
  Task(String),

  #[error("{}", failed_message(.failures))]
  Failed { failures: Vec<(String, PackageError)> },
}

fn failed_message(failures: &[(String, PackageError)]) -> String {
  let ids: Vec<&str> = failures.iter().map(|(id, _)| id.as_str()).collect();
  format!("failed to package {} function(s): {}", ids.len(), ids.join(", "))
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> PackageError + '_ {
  move |source| PackageError::Io {
    path: path.to_path_buf(),
    source,
  }
}

/// `[bundler]` configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundlerConfig {
  /// Bundler command; extra words become leading arguments.
  pub command: String,
  /// Appended to the generated bundler arguments.
  pub args: Vec<String>,
  /// Import paths left out of the bundle.
  pub externals: Vec<String>,
  /// Files kept next to the bundle, as globs rooted at the function directory.
  pub retain: Vec<String>,
  /// Functions packaged at once; defaults to the number of CPUs.
  pub parallelism: Option<usize>,
}

impl Default for BundlerConfig {
  fn default() -> Self {
    Self {
      command: "esbuild".to_string(),
      args: Vec::new(),
      externals: vec!["./.cache/telemetry/*".to_string(), "./.cache/query-engine/*".to_string()],
      retain: [
        "/.cache/data/**",
        "/.cache/caches/**",
        "/.cache/page-ssr/**",
        "/.cache/query-engine/**",
        "/.cache/telemetry/**",
      ]
      .map(str::to_string)
      .to_vec(),
      parallelism: None,
    }
  }
}

impl BundlerConfig {
  pub fn parallelism(&self) -> usize {
    self
      .parallelism
      .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4))
      .max(1)
  }
}

/// A function to package and how it will run.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageJob {
  pub function: FunctionDefinition,
  /// Listening port for container targets; `None` for serverless functions.
  pub container_port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackagedFunction {
  pub function_id: String,
  pub dir: PathBuf,
  pub container: bool,
  pub files_copied: usize,
  /// Declared files that did not exist and were skipped.
  pub files_skipped: usize,
  /// Files deleted after bundling.
  pub files_removed: usize,
}

/// Packages functions from one source tree into one output directory.
#[derive(Debug)]
pub struct Packager<B> {
  bundler: Arc<B>,
  source_root: PathBuf,
  out_dir: PathBuf,
  config: BundlerConfig,
}

impl<B> Clone for Packager<B> {
  fn clone(&self) -> Self {
    Self {
      bundler: self.bundler.clone(),
      source_root: self.source_root.clone(),
      out_dir: self.out_dir.clone(),
      config: self.config.clone(),
    }
  }
}

impl<B: Bundler + 'static> Packager<B> {
  pub fn new(bundler: B, source_root: impl Into<PathBuf>, out_dir: impl Into<PathBuf>, config: BundlerConfig) -> Self {
    Self {
      bundler: Arc::new(bundler),
      source_root: source_root.into(),
      out_dir: out_dir.into(),
      config,
    }
  }

  pub fn function_dir(&self, function_id: &str) -> PathBuf {
    self.out_dir.join(FUNCTIONS_DIR).join(function_id)
  }

  /// Package one function into `<out>/functions/<id>/`.
  pub async fn package(&self, job: &PackageJob) -> Result<PackagedFunction, PackageError> {
    let function_id = &job.function.function_id;
    if !is_single_component(function_id) {
      return Err(PackageError::InvalidFunctionId(function_id.clone()));
    }

    let dir = self.function_dir(&job.function.function_id);
    let result = self.package_into(job, &dir).await;

    if let Err(e) = &result {
      warn!(function = %job.function.function_id, error = %e, "packaging failed, removing function directory");
      match tokio::fs::remove_dir_all(&dir).await {
        Ok(()) => {}
        Err(cleanup) if cleanup.kind() == io::ErrorKind::NotFound => {}
        Err(cleanup) => {
          error!(dir = %dir.display(), error = %cleanup, "failed to remove partial function directory");
        }
      }
    }
    result
  }

  async fn package_into(&self, job: &PackageJob, dir: &Path) -> Result<PackagedFunction, PackageError> {
    let function_id = job.function.function_id.clone();
    let retain = self.retain_set(job.container_port.is_some())?;

    let staged = {
      let function = job.function.clone();
      let source_root = self.source_root.clone();
      let dir = dir.to_path_buf();
      let port = job.container_port;
      tokio::task::spawn_blocking(move || stage(&function, &source_root, &dir, port))
        .await
        .map_err(|e| PackageError::Task(e.to_string()))??
    };

    self
      .bundler
      .bundle(&BundleRequest {
        function_id: &function_id,
        working_dir: dir,
        entry: ADAPTER_FILE,
        outfile: BUNDLE_FILE,
        externals: &self.config.externals,
      })
      .await?;

    if !dir.join(BUNDLE_FILE).is_file() {
      return Err(PackageError::BundleOutputMissing { function_id });
    }

    let files_removed = {
      let dir = dir.to_path_buf();
      tokio::task::spawn_blocking(move || prune(&dir, &retain))
        .await
        .map_err(|e| PackageError::Task(e.to_string()))??
    };

    info!(
      function = %function_id,
      copied = staged.copied,
      skipped = staged.skipped,
      removed = files_removed,
      "packaged function"
    );

    Ok(PackagedFunction {
      function_id,
      dir: dir.to_path_buf(),
      container: job.container_port.is_some(),
      files_copied: staged.copied,
      files_skipped: staged.skipped,
      files_removed,
    })
  }

  fn retain_set(&self, container: bool) -> Result<GlobSet, GlobError> {
    let mut patterns = vec![format!("/{BUNDLE_FILE}"), format!("/{DESCRIPTOR_FILE}")];
    if container {
      patterns.push(format!("/{DOCKERFILE}"));
    }
    patterns.extend(self.config.retain.iter().cloned());
    GlobSet::new(patterns)
  }

  /// Package every job, at most `parallelism` at once.
  ///
  /// Every job runs to completion; failures are collected into
  /// [`PackageError::Failed`].
  pub async fn package_all(&self, jobs: Vec<PackageJob>) -> Result<Vec<PackagedFunction>, PackageError> {
    let parallelism = self.config.parallelism();
    let semaphore = Arc::new(Semaphore::new(parallelism));
    let mut join_set = JoinSet::new();

    debug!(functions = jobs.len(), parallelism, "packaging functions");

    for job in jobs {
      let packager = self.clone();
      let semaphore = semaphore.clone();

      join_set.spawn(async move {
        let id = job.function.function_id.clone();
        let result = match semaphore.acquire().await {
          Ok(_permit) => packager.package(&job).await,
          Err(e) => Err(PackageError::Task(e.to_string())),
        };
        (id, result)
      });
    }

    let mut packaged = Vec::new();
    let mut failures = Vec::new();

    while let Some(joined) = join_set.join_next().await {
      match joined {
        Ok((_, Ok(function))) => packaged.push(function),
        Ok((id, Err(e))) => failures.push((id, e)),
        Err(e) => {
          error!(error = %e, "packaging task panicked");
          failures.push(("<unknown>".to_string(), PackageError::Task(e.to_string())));
        }
      }
    }

    if !failures.is_empty() {
      failures.sort_by(|a, b| a.0.cmp(&b.0));
      return Err(PackageError::Failed { failures });
    }

    packaged.sort_by(|a, b| a.function_id.cmp(&b.function_id));
    Ok(packaged)
  }
}

struct Staged {
  copied: usize,
  skipped: usize,
}

/// Copy the function's files and write the descriptor, adapter and Dockerfile.
fn stage(function: &FunctionDefinition, source_root: &Path, dir: &Path, port: Option<u16>) -> Result<Staged, PackageError> {
  let function_id = &function.function_id;

  match std::fs::remove_dir_all(dir) {
    Ok(()) => {}
    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
    Err(e) => return Err(io_err(dir)(e)),
  }
  std::fs::create_dir_all(dir).map_err(io_err(dir))?;

  let entry = relative_to_root(&function.entry_point, source_root).ok_or_else(|| PackageError::OutsideSourceRoot {
    function_id: function_id.clone(),
    path: function.entry_point.clone(),
  })?;
  if !source_root.join(&entry).is_file() {
    return Err(PackageError::MissingEntryPoint {
      function_id: function_id.clone(),
      path: function.entry_point.clone(),
    });
  }

  let mut staged = Staged { copied: 0, skipped: 0 };
  let files = function
    .required_files
    .iter()
    .chain(std::iter::once(&function.entry_point));

  for file in files {
    let Some(rel) = relative_to_root(file, source_root) else {
      warn!(function = %function_id, file = %file.display(), "required file outside source root, skipping");
      staged.skipped += 1;
      continue;
    };
    let from = source_root.join(&rel);
    if !from.is_file() {
      debug!(function = %function_id, file = %from.display(), "required file missing, skipping");
      staged.skipped += 1;
      continue;
    }
    let to = dir.join(&rel);
    if to.exists() {
      continue;
    }
    copy_file(&from, &to).map_err(io_err(&to))?;
    staged.copied += 1;
  }

  let descriptor = dir.join(DESCRIPTOR_FILE);
  std::fs::write(&descriptor, PACKAGE_JSON).map_err(io_err(&descriptor))?;

  let adapter = dir.join(ADAPTER_FILE);
  let entry = format!(".{}", to_url_path(&entry));
  std::fs::write(&adapter, render_handler(&entry)).map_err(io_err(&adapter))?;

  if let Some(port) = port {
    let dockerfile = dir.join(DOCKERFILE);
    std::fs::write(&dockerfile, render_dockerfile(port)).map_err(io_err(&dockerfile))?;
  }

  Ok(staged)
}

/// Delete every file under `dir` not matched by `retain`, then empty directories.
fn prune(dir: &Path, retain: &GlobSet) -> Result<usize, PackageError> {
  let mut removed = 0;

  for entry in WalkDir::new(dir).min_depth(1) {
    let entry = entry.map_err(|e| io_err(dir)(io::Error::other(e)))?;
    if entry.file_type().is_dir() {
      continue;
    }
    let rel = entry.path().strip_prefix(dir).unwrap_or(entry.path());
    if retain.is_match(&to_url_path(rel)) {
      continue;
    }
    std::fs::remove_file(entry.path()).map_err(io_err(entry.path()))?;
    removed += 1;
  }

  prune_empty_dirs(dir).map_err(io_err(dir))?;
  Ok(removed)
}
