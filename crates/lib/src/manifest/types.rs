//! Manifest types for stratus.
//!
//! The manifest is the persisted build descriptor bridging the build phase and
//! the infrastructure-synthesis phase. The two phases may run in different
//! processes, on different machines, at different times, so the shape below
//! is a compatibility contract.
//!
//! # Example
//!
//! ```json
//! {
//!   "version": 1,
//!   "buildId": "0192f3a4b5c6d-1a2b3c4d",
//!   "routes": [{ "type": "static", "path": "/app.js", "filePath": "public/app.js", "headers": [...] }],
//!   "assetGroups": [{ "hash": "a1b2c3d4e5f6789012ab", "contentType": "...", "assets": [...] }],
//!   "functions": [{ "functionId": "ssr-engine", "name": "SSR", "entryPoint": "...", "requiredFiles": [...] }]
//! }
//! ```

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assets::AssetGroup;
use crate::route::{FunctionDefinition, Route, StaticRoute};
use crate::util::fs::is_single_component;

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

/// Unique, time-sortable identifier of one build.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BuildId(pub String);

impl std::fmt::Display for BuildId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
  pub version: u32,
  pub build_id: BuildId,
  pub routes: Vec<Route>,
  pub asset_groups: Vec<AssetGroup>,
  pub functions: Vec<FunctionDefinition>,
}

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("duplicate route path {0}")]
  DuplicatePath(String),

  #[error("duplicate function id {0}")]
  DuplicateFunction(String),

  #[error("function id {0:?} must be a single path segment")]
  InvalidFunctionId(String),

  #[error("route {path} references unknown function {function_id}")]
  DanglingFunction { path: String, function_id: String },

  #[error("failed to read manifest {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write manifest {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse manifest: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("failed to serialize manifest: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("unsupported manifest version {0}, expected {MANIFEST_VERSION}")]
  UnsupportedVersion(u32),
}

impl Manifest {
  pub fn static_routes(&self) -> impl Iterator<Item = &StaticRoute> {
    self.routes.iter().filter_map(Route::as_static)
  }

  pub fn function(&self, function_id: &str) -> Option<&FunctionDefinition> {
    self.functions.iter().find(|f| f.function_id == function_id)
  }

  pub fn ssr_engine(&self) -> Option<&FunctionDefinition> {
    self.functions.iter().find(|f| f.is_ssr_engine())
  }

  /// Check the references the builder forwards without inspecting.
  ///
  /// Reports duplicate route paths, duplicate function ids, and function
  /// routes whose function id has no definition. A dangling reference means
  /// the generator and this tool disagree about the output format.
  pub fn validate(&self) -> Result<(), ManifestError> {
    let mut function_ids = HashSet::new();
    for function in &self.functions {
      if !is_single_component(&function.function_id) {
        return Err(ManifestError::InvalidFunctionId(function.function_id.clone()));
      }
      if !function_ids.insert(function.function_id.as_str()) {
        return Err(ManifestError::DuplicateFunction(function.function_id.clone()));
      }
    }

    let mut paths = HashSet::new();
    for route in &self.routes {
      if !paths.insert(route.path()) {
        return Err(ManifestError::DuplicatePath(route.path().to_string()));
      }
      if let Some(function_id) = route.function_id()
        && !function_ids.contains(function_id)
      {
        return Err(ManifestError::DanglingFunction {
          path: route.path().to_string(),
          function_id: function_id.to_string(),
        });
      }
    }

    Ok(())
  }
}
