//! Bundler invocation.

use std::future::Future;
use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info};

use super::{BundlerConfig, PackageError};

/// One bundling job: `entry` inside `working_dir` bundled to `outfile`.
#[derive(Debug, Clone, Copy)]
pub struct BundleRequest<'a> {
  pub function_id: &'a str,
  pub working_dir: &'a Path,
  pub entry: &'a str,
  pub outfile: &'a str,
  pub externals: &'a [String],
}

pub trait Bundler: Send + Sync {
  fn bundle(&self, request: &BundleRequest<'_>) -> impl Future<Output = Result<(), PackageError>> + Send;
}

/// Runs esbuild (or a compatible command) as a child process.
#[derive(Debug, Clone)]
pub struct EsbuildBundler {
  program: String,
  leading_args: Vec<String>,
  extra_args: Vec<String>,
}

impl EsbuildBundler {
  pub fn new(config: &BundlerConfig) -> Self {
    let mut words = config.command.split_whitespace().map(str::to_string);
    let program = words.next().unwrap_or_else(|| "esbuild".to_string());
    Self {
      program,
      leading_args: words.collect(),
      extra_args: config.args.clone(),
    }
  }

  pub fn program(&self) -> &str {
    &self.program
  }

  pub fn args(&self, request: &BundleRequest<'_>) -> Vec<String> {
    let mut args = self.leading_args.clone();
    args.push(request.entry.to_string());
    args.extend(
      [
        "--bundle",
        "--platform=node",
        "--target=node20",
        "--format=cjs",
        "--log-level=warning",
      ]
      .map(str::to_string),
    );
    args.push(format!("--outfile={}", request.outfile));
    args.extend(request.externals.iter().map(|e| format!("--external:{e}")));
    args.extend(self.extra_args.iter().cloned());
    args
  }
}

impl Default for EsbuildBundler {
  fn default() -> Self {
    Self::new(&BundlerConfig::default())
  }
}

impl Bundler for EsbuildBundler {
  async fn bundle(&self, request: &BundleRequest<'_>) -> Result<(), PackageError> {
    let args = self.args(request);
    info!(function = request.function_id, program = %self.program, "bundling function");
    debug!(args = ?args, working_dir = %request.working_dir.display(), "spawning bundler");

    let output = Command::new(&self.program)
      .args(&args)
      .current_dir(request.working_dir)
      .output()
      .await
      .map_err(|source| PackageError::BundleSpawn {
        program: self.program.clone(),
        source,
      })?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
      if !stderr.is_empty() {
        debug!(stderr = %stderr, "bundler stderr");
      }
      return Err(PackageError::BundleFailed {
        function_id: request.function_id.to_string(),
        code: output.status.code(),
        stderr,
      });
    }

    Ok(())
  }
}
