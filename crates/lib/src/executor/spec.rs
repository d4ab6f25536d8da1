//! Resolved executor specs.
//!
//! A spec is the fully-populated description of one function's backend, the
//! input to [`InfraTarget`](crate::synth::InfraTarget) declarations. Specs are
//! produced by merging the user's [`ExecutorOptions`] over the defaults for the
//! function's kind, with the values stratus derives itself (ids, code
//! location, handler, runtime) pinned in the protected tier.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::options::{Architecture, ExecutorOptions};
use crate::config::{MergeError, Layers};
use crate::consts::FUNCTIONS_DIR;
use crate::route::FunctionDefinition;

pub const LAMBDA_HANDLER: &str = "index.handle";
pub const LAMBDA_RUNTIME: &str = "nodejs20.x";

pub const FUNCTION_TIMEOUT_SECS: u32 = 10;
pub const FUNCTION_MEMORY_MB: u32 = 1024;
pub const SSR_TIMEOUT_SECS: u32 = 30;
pub const SSR_MEMORY_MB: u32 = 2048;

pub const CONTAINER_CPU: u32 = 1024;
pub const CONTAINER_MEMORY_MB: u32 = 2048;
pub const CONTAINER_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaSpec {
  pub function_id: String,
  pub name: String,
  pub code_dir: PathBuf,
  pub handler: String,
  pub runtime: String,
  pub timeout_secs: u32,
  pub memory_mb: u32,
  pub provisioned_concurrency: Option<u32>,
  pub architecture: Architecture,
  pub environment: BTreeMap<String, String>,
  /// Digest of the packaged code directory, filled in at synthesis.
  pub code_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
  pub function_id: String,
  pub name: String,
  pub context_dir: PathBuf,
  pub cpu: u32,
  pub memory_mb: u32,
  pub desired_count: u32,
  pub port: u16,
  pub health_check_path: String,
  pub environment: BTreeMap<String, String>,
}

/// What a function resolves to once configuration is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutorSpec {
  Disabled { function_id: String },
  Lambda(LambdaSpec),
  Container(ServiceSpec),
}

impl ExecutorSpec {
  pub fn function_id(&self) -> &str {
    match self {
      ExecutorSpec::Disabled { function_id } => function_id,
      ExecutorSpec::Lambda(spec) => &spec.function_id,
      ExecutorSpec::Container(spec) => &spec.function_id,
    }
  }

  pub fn is_disabled(&self) -> bool {
    matches!(self, ExecutorSpec::Disabled { .. })
  }
}

/// Pick the options that apply to `function`.
///
/// SSR engine: `ssr` → `per_function[id]` → default.
/// Everything else: `per_function[id]` → `fallback` → default.
pub fn select_options<'a>(
  function: &FunctionDefinition,
  per_function: &'a BTreeMap<String, ExecutorOptions>,
  fallback: Option<&'a ExecutorOptions>,
  ssr: Option<&'a ExecutorOptions>,
) -> Option<&'a ExecutorOptions> {
  if function.is_ssr_engine() {
    ssr.or_else(|| per_function.get(&function.function_id))
  } else {
    per_function.get(&function.function_id).or(fallback)
  }
}

/// Resolve `options` into a concrete spec. Functions without options run on
/// Lambda with the defaults for their kind.
pub fn resolve_spec(function: &FunctionDefinition, options: Option<&ExecutorOptions>) -> Result<ExecutorSpec, MergeError> {
  let default = ExecutorOptions::lambda();
  let options = options.unwrap_or(&default);

  match options {
    ExecutorOptions::Disabled => Ok(ExecutorSpec::Disabled {
      function_id: function.function_id.clone(),
    }),
    ExecutorOptions::Lambda(user) => {
      let spec = Layers::new(&lambda_base(function))?
        .user(Some(user))?
        .protected(&json!({
          "function_id": function.function_id,
          "code_dir": code_dir(function),
          "handler": LAMBDA_HANDLER,
          "runtime": LAMBDA_RUNTIME,
        }))?
        .resolve()?;
      Ok(ExecutorSpec::Lambda(spec))
    }
    ExecutorOptions::Container(user) => {
      let spec = Layers::new(&service_base(function))?
        .user(Some(user))?
        .protected(&json!({
          "function_id": function.function_id,
          "context_dir": code_dir(function),
        }))?
        .resolve()?;
      Ok(ExecutorSpec::Container(spec))
    }
  }
}

fn code_dir(function: &FunctionDefinition) -> PathBuf {
  PathBuf::from(FUNCTIONS_DIR).join(&function.function_id)
}

fn lambda_base(function: &FunctionDefinition) -> LambdaSpec {
  let (timeout_secs, memory_mb) = if function.is_ssr_engine() {
    (SSR_TIMEOUT_SECS, SSR_MEMORY_MB)
  } else {
    (FUNCTION_TIMEOUT_SECS, FUNCTION_MEMORY_MB)
  };

  LambdaSpec {
    function_id: function.function_id.clone(),
    name: function.name.clone(),
    code_dir: code_dir(function),
    handler: LAMBDA_HANDLER.to_string(),
    runtime: LAMBDA_RUNTIME.to_string(),
    timeout_secs,
    memory_mb,
    provisioned_concurrency: None,
    architecture: Architecture::default(),
    environment: BTreeMap::new(),
    code_hash: None,
  }
}

fn service_base(function: &FunctionDefinition) -> ServiceSpec {
  ServiceSpec {
    function_id: function.function_id.clone(),
    name: function.name.clone(),
    context_dir: code_dir(function),
    cpu: CONTAINER_CPU,
    memory_mb: CONTAINER_MEMORY_MB,
    desired_count: 1,
    port: CONTAINER_PORT,
    health_check_path: "/".to_string(),
    environment: BTreeMap::new(),
  }
}
