//! JSON stack document target.
//!
//! Records every declaration as a resource with token-style references
//! (`${<logical-id>.<attribute>}`) that a provisioning tool resolves at
//! deploy time.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use super::{AssetDeploymentSpec, BucketSpec, InfraTarget, SynthError};
use crate::config::ClusterConfig;
use crate::executor::{ContainerExecutor, LambdaExecutor, LambdaSpec, ServiceSpec};
use crate::routing::{BucketOrigin, DistributionPlan, ViewerRewrite, render_viewer_function};
use crate::util::fs::write_atomic;

pub const STACK_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
  pub logical_id: String,
  #[serde(rename = "type")]
  pub kind: String,
  pub properties: Value,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackDocument {
  pub version: u32,
  pub resources: Vec<Resource>,
  pub outputs: BTreeMap<String, String>,
}

impl Default for StackDocument {
  fn default() -> Self {
    Self {
      version: STACK_VERSION,
      resources: Vec::new(),
      outputs: BTreeMap::new(),
    }
  }
}

/// `${<logical_id>.<attribute>}`
pub fn token(logical_id: &str, attribute: &str) -> String {
  format!("${{{logical_id}.{attribute}}}")
}

/// `fn-hello` → `FnHello`.
pub fn logical_id(prefix: &str, id: &str) -> String {
  let mut out = prefix.to_string();
  for word in id.split(|c: char| !c.is_ascii_alphanumeric()).filter(|w| !w.is_empty()) {
    let mut chars = word.chars();
    if let Some(first) = chars.next() {
      out.push(first.to_ascii_uppercase());
      out.extend(chars);
    }
  }
  out
}

impl StackDocument {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
    self.resources.iter().find(|r| r.logical_id == logical_id)
  }

  pub fn resources_of(&self, kind: &str) -> impl Iterator<Item = &Resource> {
    self.resources.iter().filter(move |r| r.kind == kind)
  }

  fn add(&mut self, logical_id: String, kind: &str, properties: Value, depends_on: Vec<String>) -> Result<(), SynthError> {
    if self.resource(&logical_id).is_some() {
      return Err(SynthError::DuplicateResource(logical_id));
    }
    debug!(logical_id = %logical_id, kind, "declared resource");
    self.resources.push(Resource {
      logical_id,
      kind: kind.to_string(),
      properties,
      depends_on,
    });
    Ok(())
  }

  /// Write the document as pretty JSON, atomically.
  pub fn save(&self, path: &Path) -> Result<PathBuf, SynthError> {
    let json = serde_json::to_string_pretty(self).map_err(SynthError::Serialize)?;
    write_atomic(path, json.as_bytes()).map_err(|source| SynthError::Write {
      path: path.to_path_buf(),
      source,
    })?;
    Ok(path.to_path_buf())
  }
}

impl InfraTarget for StackDocument {
  fn declare_bucket(&mut self, spec: &BucketSpec) -> Result<BucketOrigin, SynthError> {
    self.add(
      spec.logical_id.clone(),
      "bucket",
      json!({ "publicAccess": false, "encryption": "managed" }),
      vec![],
    )?;

    if let Some(principal) = &spec.writer_principal {
      self.add(
        format!("{}WriteGrant", spec.logical_id),
        "bucket-grant",
        json!({
          "bucket": token(&spec.logical_id, "Name"),
          "principal": principal,
          "actions": ["put", "delete", "list"],
        }),
        vec![spec.logical_id.clone()],
      )?;
    }

    self
      .outputs
      .insert("AssetsBucket".to_string(), token(&spec.logical_id, "Name"));

    Ok(BucketOrigin {
      bucket: token(&spec.logical_id, "Name"),
      domain: token(&spec.logical_id, "DomainName"),
    })
  }

  fn declare_asset_deployment(&mut self, bucket: &BucketOrigin, spec: &AssetDeploymentSpec) -> Result<(), SynthError> {
    let bucket_id = bucket_logical_id(bucket);
    self.add(
      spec.logical_id.clone(),
      "asset-deployment",
      json!({
        "bucket": bucket.bucket,
        "source": spec.source_dir,
        "contentType": spec.content_type,
        "cacheControl": spec.cache_control,
        "objects": spec.object_count,
        "prune": false,
      }),
      bucket_id.into_iter().collect(),
    )
  }

  fn declare_lambda(&mut self, spec: &LambdaSpec) -> Result<LambdaExecutor, SynthError> {
    let function_id = logical_id("Function", &spec.function_id);
    let url_id = format!("{function_id}Url");

    self.add(
      function_id.clone(),
      "lambda-function",
      json!({
        "name": spec.name,
        "code": spec.code_dir,
        "codeHash": spec.code_hash,
        "handler": spec.handler,
        "runtime": spec.runtime,
        "timeoutSecs": spec.timeout_secs,
        "memoryMb": spec.memory_mb,
        "architecture": spec.architecture,
        "environment": spec.environment,
        "provisionedConcurrency": spec.provisioned_concurrency,
      }),
      vec![],
    )?;
    self.add(
      url_id.clone(),
      "function-url",
      json!({ "function": token(&function_id, "Arn"), "authType": "none" }),
      vec![function_id],
    )?;

    Ok(LambdaExecutor {
      function_id: spec.function_id.clone(),
      name: spec.name.clone(),
      domain: token(&url_id, "Url"),
      provisioned_concurrency: spec.provisioned_concurrency,
    })
  }

  fn declare_service(&mut self, spec: &ServiceSpec, cluster: &ClusterConfig) -> Result<ContainerExecutor, SynthError> {
    let service_id = logical_id("Service", &spec.function_id);
    let lb_id = format!("{service_id}LoadBalancer");

    self.add(
      service_id.clone(),
      "container-service",
      json!({
        "name": spec.name,
        "cluster": cluster.name,
        "vpc": cluster.vpc_id,
        "subnets": cluster.subnet_ids,
        "securityGroups": cluster.security_group_ids,
        "image": { "context": spec.context_dir },
        "cpu": spec.cpu,
        "memoryMb": spec.memory_mb,
        "desiredCount": spec.desired_count,
        "port": spec.port,
        "environment": spec.environment,
      }),
      vec![],
    )?;
    self.add(
      lb_id.clone(),
      "load-balancer",
      json!({
        "target": token(&service_id, "Arn"),
        "port": spec.port,
        "healthCheckPath": spec.health_check_path,
      }),
      vec![service_id],
    )?;

    Ok(ContainerExecutor {
      function_id: spec.function_id.clone(),
      name: spec.name.clone(),
      dns_name: token(&lb_id, "DnsName"),
    })
  }

  fn declare_distribution(&mut self, plan: &DistributionPlan) -> Result<(), SynthError> {
    let mut viewer_functions: Vec<(Vec<ViewerRewrite>, String)> = Vec::new();
    let mut behaviors = Vec::new();

    for behavior in plan.all_behaviors() {
      let mut value = serde_json::to_value(behavior).map_err(SynthError::Serialize)?;
      if !behavior.viewer_rewrites.is_empty() {
        let existing = viewer_functions
          .iter()
          .find(|(rewrites, _)| *rewrites == behavior.viewer_rewrites)
          .map(|(_, id)| id.clone());
        let id = match existing {
          Some(id) => id,
          None => {
            let id = format!("ViewerFunction{}", viewer_functions.len() + 1);
            self.add(
              id.clone(),
              "viewer-function",
              json!({ "runtime": "js-2.0", "code": render_viewer_function(&behavior.viewer_rewrites) }),
              vec![],
            )?;
            viewer_functions.push((behavior.viewer_rewrites.clone(), id.clone()));
            id
          }
        };
        value["viewer_request_function"] = Value::String(token(&id, "Arn"));
      }
      behaviors.push(value);
    }

    let default_behavior = behaviors.pop().unwrap_or(Value::Null);
    let depends_on: Vec<String> = self.resources.iter().map(|r| r.logical_id.clone()).collect();
    self.add(
      "Distribution".to_string(),
      "distribution",
      json!({
        "defaultBehavior": default_behavior,
        "behaviors": behaviors,
        "httpVersion": "http2and3",
        "priceClass": "all",
      }),
      depends_on,
    )?;
    self
      .outputs
      .insert("DistributionDomain".to_string(), token("Distribution", "DomainName"));
    Ok(())
  }
}

/// Recover the logical id from a `${Id.Name}` bucket token.
fn bucket_logical_id(bucket: &BucketOrigin) -> Option<String> {
  bucket
    .bucket
    .strip_prefix("${")
    .and_then(|rest| rest.split_once('.'))
    .map(|(id, _)| id.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn logical_ids_are_pascal_case() {
    assert_eq!(logical_id("Function", "fn-hello"), "FunctionFnHello");
    assert_eq!(logical_id("Service", "ssr-engine"), "ServiceSsrEngine");
    assert_eq!(logical_id("Function", "api/users/[id]"), "FunctionApiUsersId");
  }

  #[test]
  fn tokens() {
    assert_eq!(token("FunctionFnHelloUrl", "Url"), "${FunctionFnHelloUrl.Url}");
  }

  #[test]
  fn bucket_grant_only_with_principal() {
    let mut stack = StackDocument::new();
    let origin = stack
      .declare_bucket(&BucketSpec {
        logical_id: "AssetsBucket".to_string(),
        writer_principal: None,
      })
      .unwrap();
    assert_eq!(origin.domain, "${AssetsBucket.DomainName}");
    assert_eq!(stack.resources.len(), 1);

    let mut stack = StackDocument::new();
    stack
      .declare_bucket(&BucketSpec {
        logical_id: "AssetsBucket".to_string(),
        writer_principal: Some("arn:deployer".to_string()),
      })
      .unwrap();
    let grant = stack.resource("AssetsBucketWriteGrant").unwrap();
    assert_eq!(grant.properties["principal"], "arn:deployer");
    assert_eq!(grant.depends_on, vec!["AssetsBucket".to_string()]);
  }

  #[test]
  fn duplicate_logical_ids_are_rejected() {
    let mut stack = StackDocument::new();
    let spec = BucketSpec {
      logical_id: "AssetsBucket".to_string(),
      writer_principal: None,
    };
    stack.declare_bucket(&spec).unwrap();
    assert!(matches!(
      stack.declare_bucket(&spec),
      Err(SynthError::DuplicateResource(id)) if id == "AssetsBucket"
    ));
  }

  #[test]
  fn bucket_token_round_trips_to_logical_id() {
    let origin = BucketOrigin {
      bucket: token("AssetsBucket", "Name"),
      domain: token("AssetsBucket", "DomainName"),
    };
    assert_eq!(bucket_logical_id(&origin).as_deref(), Some("AssetsBucket"));
  }
}
