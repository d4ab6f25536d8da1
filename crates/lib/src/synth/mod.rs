//! Infrastructure synthesis.
//!
//! Turns a manifest plus configuration into declarations against an
//! [`InfraTarget`]: the asset bucket, one deployment per asset group, one
//! backend per enabled function, and the distribution that routes between
//! them. Every configuration check runs before the first declaration, so a
//! bad configuration never produces a partial stack.

mod stack;

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub use stack::*;

use crate::config::{ClusterConfig, Config, MergeError};
use crate::consts::{ASSETS_DIR, FUNCTIONS_DIR};
use crate::executor::{ContainerExecutor, Executor, ExecutorSpec, LambdaExecutor, LambdaSpec, ServiceSpec};
use crate::manifest::{Manifest, ManifestError};
use crate::package::BUNDLE_FILE;
use crate::routing::{BucketOrigin, DistributionPlan, PlanInput, RoutingError, plan_distribution};
use crate::util::hash::{DirHashError, ObjectHash, hash_directory};

pub const BUCKET_LOGICAL_ID: &str = "AssetsBucket";

#[derive(Debug, Error)]
pub enum SynthError {
  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error("invalid executor options for {function_id}: {source}")]
  Executor {
    function_id: String,
    #[source]
    source: MergeError,
  },

  #[error("function {function_id} requests a container executor but no [cluster] is configured")]
  MissingCluster { function_id: String },

  #[error("function {function_id} has not been packaged ({path} is missing)")]
  MissingPackage { function_id: String, path: PathBuf },

  #[error("failed to hash code for {function_id}: {source}")]
  CodeHash {
    function_id: String,
    #[source]
    source: DirHashError,
  },

  #[error(transparent)]
  Routing(#[from] RoutingError),

  #[error("resource {0} declared twice")]
  DuplicateResource(String),

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to serialize stack: {0}")]
  Serialize(#[source] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSpec {
  pub logical_id: String,
  /// Principal granted write access for asset uploads.
  pub writer_principal: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDeploymentSpec {
  pub logical_id: String,
  pub group_hash: ObjectHash,
  pub source_dir: PathBuf,
  pub content_type: String,
  pub cache_control: Option<String>,
  pub object_count: usize,
}

/// Where declarations go.
pub trait InfraTarget {
  fn declare_bucket(&mut self, spec: &BucketSpec) -> Result<BucketOrigin, SynthError>;

  fn declare_asset_deployment(&mut self, bucket: &BucketOrigin, spec: &AssetDeploymentSpec) -> Result<(), SynthError>;

  fn declare_lambda(&mut self, spec: &LambdaSpec) -> Result<LambdaExecutor, SynthError>;

  fn declare_service(&mut self, spec: &ServiceSpec, cluster: &ClusterConfig) -> Result<ContainerExecutor, SynthError>;

  fn declare_distribution(&mut self, plan: &DistributionPlan) -> Result<(), SynthError>;
}

#[derive(Debug, Clone)]
pub struct SynthOptions {
  /// Build output directory holding `assets/` and `functions/`.
  pub out_dir: PathBuf,
  /// Require every enabled function to be packaged, and record code hashes.
  pub verify_packages: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthReport {
  pub executors: Vec<Executor>,
  /// Functions removed from routing by a `disabled` executor.
  pub disabled: Vec<String>,
  pub plan: DistributionPlan,
}

pub fn synthesize<T: InfraTarget>(
  manifest: &Manifest,
  config: &Config,
  options: &SynthOptions,
  target: &mut T,
) -> Result<SynthReport, SynthError> {
  manifest.validate()?;

  let mut specs = Vec::new();
  let mut disabled = Vec::new();
  for function in &manifest.functions {
    let spec = config
      .executor_spec(function)
      .map_err(|source| SynthError::Executor {
        function_id: function.function_id.clone(),
        source,
      })?;
    match spec {
      ExecutorSpec::Disabled { function_id } => {
        info!(function = %function_id, "executor disabled, removing function from routing");
        disabled.push(function_id);
      }
      spec => specs.push(spec),
    }
  }

  let cluster = check_cluster(&specs, config)?;
  if options.verify_packages {
    verify_packages(&mut specs, &options.out_dir)?;
  }

  // Routing checks (assets prefix, path patterns, overrides) need origins, so
  // run the planner over placeholders before the real declarations.
  let placeholders: Vec<Executor> = specs.iter().filter_map(placeholder_executor).collect();
  plan_distribution(&plan_input(&placeholder_bucket(), &placeholders, config))?;

  let bucket = target.declare_bucket(&BucketSpec {
    logical_id: BUCKET_LOGICAL_ID.to_string(),
    writer_principal: config.deployer_principal.clone(),
  })?;

  for group in &manifest.asset_groups {
    target.declare_asset_deployment(
      &bucket,
      &AssetDeploymentSpec {
        logical_id: format!("Assets{}", group.hash),
        group_hash: group.hash.clone(),
        source_dir: options.out_dir.join(ASSETS_DIR).join(&group.hash.0),
        content_type: group.content_type.clone(),
        cache_control: group.cache_control.clone(),
        object_count: group.assets.len(),
      },
    )?;
  }

  let mut executors = Vec::with_capacity(specs.len());
  for spec in &specs {
    let executor = match spec {
      ExecutorSpec::Lambda(spec) => Executor::Lambda(target.declare_lambda(spec)?),
      ExecutorSpec::Container(spec) => match cluster {
        Some(cluster) => Executor::Container(target.declare_service(spec, cluster)?),
        None => {
          return Err(SynthError::MissingCluster {
            function_id: spec.function_id.clone(),
          });
        }
      },
      ExecutorSpec::Disabled { .. } => continue,
    };
    executors.push(executor);
  }

  let plan = plan_distribution(&plan_input(&bucket, &executors, config))?;
  target.declare_distribution(&plan)?;

  info!(
    executors = executors.len(),
    disabled = disabled.len(),
    asset_groups = manifest.asset_groups.len(),
    "synthesized stack"
  );

  Ok(SynthReport {
    executors,
    disabled,
    plan,
  })
}

fn plan_input<'a>(bucket: &'a BucketOrigin, executors: &'a [Executor], config: &'a Config) -> PlanInput<'a> {
  PlanInput {
    bucket,
    executors,
    assets_prefix: &config.assets_prefix,
    overrides: &config.behaviors,
    disable_caching: config.disable_caching,
  }
}

fn placeholder_bucket() -> BucketOrigin {
  BucketOrigin {
    bucket: BUCKET_LOGICAL_ID.to_string(),
    domain: "placeholder.invalid".to_string(),
  }
}

fn placeholder_executor(spec: &ExecutorSpec) -> Option<Executor> {
  match spec {
    ExecutorSpec::Lambda(spec) => Some(Executor::Lambda(LambdaExecutor {
      function_id: spec.function_id.clone(),
      name: spec.name.clone(),
      domain: "placeholder.invalid".to_string(),
      provisioned_concurrency: spec.provisioned_concurrency,
    })),
    ExecutorSpec::Container(spec) => Some(Executor::Container(ContainerExecutor {
      function_id: spec.function_id.clone(),
      name: spec.name.clone(),
      dns_name: "placeholder.invalid".to_string(),
    })),
    ExecutorSpec::Disabled { .. } => None,
  }
}

/// Fail before any declaration when a container executor has no cluster.
fn check_cluster<'a>(specs: &[ExecutorSpec], config: &'a Config) -> Result<Option<&'a ClusterConfig>, SynthError> {
  let container = specs.iter().find(|s| matches!(s, ExecutorSpec::Container(_)));
  match (container, config.cluster.as_ref()) {
    (Some(spec), None) => Err(SynthError::MissingCluster {
      function_id: spec.function_id().to_string(),
    }),
    (_, cluster) => Ok(cluster),
  }
}

fn verify_packages(specs: &mut [ExecutorSpec], out_dir: &Path) -> Result<(), SynthError> {
  for spec in specs.iter_mut() {
    let function_id = spec.function_id().to_string();
    let dir = out_dir.join(FUNCTIONS_DIR).join(&function_id);
    let bundle = dir.join(BUNDLE_FILE);
    if !bundle.is_file() {
      warn!(function = %function_id, path = %bundle.display(), "function not packaged");
      return Err(SynthError::MissingPackage {
        function_id,
        path: bundle,
      });
    }

    if let ExecutorSpec::Lambda(lambda) = spec {
      let hash = hash_directory(&dir, &[]).map_err(|source| SynthError::CodeHash {
        function_id: function_id.clone(),
        source,
      })?;
      lambda.code_hash = Some(hash.0);
    }
  }
  Ok(())
}
