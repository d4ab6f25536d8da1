//! Project configuration (`stratus.toml`).
//!
//! ```toml
//! assets_prefix = "/_assets"
//! disable_caching = false
//! deployer_principal = "arn:aws:iam::123456789012:role/deployer"
//!
//! [[cache_control]]
//! pattern = "/static/**"
//! policy = "immutable"
//!
//! [executors.fn-hello]
//! target = "container"
//! port = 3000
//!
//! [ssr_executor]
//! target = "lambda"
//! memory_mb = 3008
//!
//! [behaviors.functions]
//! cache_policy = "caching-optimized"
//!
//! [cluster]
//! name = "web"
//! vpc_id = "vpc-0abc"
//! subnet_ids = ["subnet-1", "subnet-2"]
//! ```
//!
//! The file is located by, in order: an explicit path, the `STRATUS_CONFIG`
//! environment variable, then `stratus.toml` in the working directory. A
//! missing default file yields the default configuration; a missing explicit
//! file is an error.

mod merge;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use merge::*;

use crate::consts::{CONFIG_ENV, CONFIG_FILENAME, DEFAULT_ASSETS_PREFIX};
use crate::executor::{ExecutorOptions, ExecutorSpec, resolve_spec, select_options};
use crate::headers::{CacheRule, CompiledRules};
use crate::package::BundlerConfig;
use crate::route::FunctionDefinition;
use crate::routing::BehaviorOverrides;
use crate::sync::SyncConfig;
use crate::util::glob::GlobError;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("config file not found: {0}")]
  NotFound(PathBuf),

  #[error("failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("invalid cache_control rule: {0}")]
  InvalidRule(#[from] GlobError),
}

/// Compute cluster for container executors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterConfig {
  pub name: String,
  pub vpc_id: String,
  #[serde(default)]
  pub subnet_ids: Vec<String>,
  #[serde(default)]
  pub security_group_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  pub cache_control: Vec<CacheRule>,
  pub executors: BTreeMap<String, ExecutorOptions>,
  pub default_executor: Option<ExecutorOptions>,
  pub ssr_executor: Option<ExecutorOptions>,
  pub behaviors: BehaviorOverrides,
  pub disable_caching: bool,
  pub deployer_principal: Option<String>,
  pub cluster: Option<ClusterConfig>,
  pub bundler: BundlerConfig,
  pub sync: SyncConfig,
  pub assets_prefix: String,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      cache_control: Vec::new(),
      executors: BTreeMap::new(),
      default_executor: None,
      ssr_executor: None,
      behaviors: BehaviorOverrides::default(),
      disable_caching: false,
      deployer_principal: None,
      cluster: None,
      bundler: BundlerConfig::default(),
      sync: SyncConfig::default(),
      assets_prefix: DEFAULT_ASSETS_PREFIX.to_string(),
    }
  }
}

impl Config {
  pub fn parse(source: &str, path: &Path) -> Result<Self, ConfigError> {
    let config: Config = toml::from_str(source).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    // Surface bad glob patterns at load time rather than mid-build.
    config.compiled_rules()?;
    Ok(config)
  }

  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    if !path.exists() {
      return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::parse(&source, path)
  }

  /// Load the configuration that applies to `cwd`.
  ///
  /// Returns the configuration and the path it came from, if any.
  pub fn discover(explicit: Option<&Path>, cwd: &Path) -> Result<(Self, Option<PathBuf>), ConfigError> {
    if let Some(path) = config_path(explicit) {
      debug!(path = %path.display(), "loading config");
      return Ok((Self::load(&path)?, Some(path)));
    }

    let default = cwd.join(CONFIG_FILENAME);
    if default.is_file() {
      debug!(path = %default.display(), "loading config");
      return Ok((Self::load(&default)?, Some(default)));
    }

    debug!("no config file, using defaults");
    Ok((Self::default(), None))
  }

  /// Built-in cache rules merged with `[[cache_control]]`.
  pub fn compiled_rules(&self) -> Result<CompiledRules, GlobError> {
    CompiledRules::with_builtins(&self.cache_control)
  }

  /// Resolve the executor for one function.
  pub fn executor_spec(&self, function: &FunctionDefinition) -> Result<ExecutorSpec, MergeError> {
    let options = select_options(
      function,
      &self.executors,
      self.default_executor.as_ref(),
      self.ssr_executor.as_ref(),
    );
    resolve_spec(function, options)
  }
}

/// Explicit path, else `STRATUS_CONFIG` when set and non-empty.
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
  explicit.map(Path::to_path_buf).or_else(|| {
    std::env::var_os(CONFIG_ENV)
      .filter(|v| !v.is_empty())
      .map(PathBuf::from)
  })
}
