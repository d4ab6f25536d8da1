//! Route and function definitions as emitted by the site generator.
//!
//! Routes are a tagged union on the `type` field:
//!
//! ```json
//! { "type": "static", "path": "/app-1a2b.js", "filePath": "public/app-1a2b.js", "headers": [] }
//! { "type": "function", "path": "/api/hello", "functionId": "fn-hello" }
//! { "type": "redirect", "path": "/old", "toPath": "/new", "status": 301 }
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts::SSR_ENGINE_ID;

/// A single HTTP header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Header {
  pub key: String,
  pub value: String,
}

impl Header {
  pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      key: key.into(),
      value: value.into(),
    }
  }
}

/// A route backed by a file in the generator's output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticRoute {
  pub path: String,
  pub file_path: PathBuf,
  #[serde(default)]
  pub headers: Vec<Header>,
}

impl StaticRoute {
  /// Value of the `cache-control` header, if one is present.
  pub fn cache_control(&self) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|h| h.key.eq_ignore_ascii_case("cache-control"))
      .map(|h| h.value.as_str())
  }
}

/// A route served by a server-side function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionRoute {
  pub path: String,
  pub function_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cache: Option<bool>,
}

/// A redirect from one path to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectRoute {
  pub path: String,
  pub to_path: String,
  #[serde(default = "default_redirect_status")]
  pub status: u16,
  #[serde(default)]
  pub headers: Vec<Header>,
}

fn default_redirect_status() -> u16 {
  301
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Route {
  Static(StaticRoute),
  Function(FunctionRoute),
  Redirect(RedirectRoute),
}

impl Route {
  pub fn path(&self) -> &str {
    match self {
      Route::Static(r) => &r.path,
      Route::Function(r) => &r.path,
      Route::Redirect(r) => &r.path,
    }
  }

  pub fn as_static(&self) -> Option<&StaticRoute> {
    match self {
      Route::Static(r) => Some(r),
      _ => None,
    }
  }

  pub fn function_id(&self) -> Option<&str> {
    match self {
      Route::Function(r) => Some(&r.function_id),
      _ => None,
    }
  }
}

/// A unit of server-executed logic produced by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDefinition {
  pub function_id: String,
  pub name: String,
  /// Files needed at runtime, relative to the site root (or absolute inside it).
  #[serde(default)]
  pub required_files: Vec<PathBuf>,
  /// The compiled entry module, relative to the site root.
  pub entry_point: PathBuf,
}

impl FunctionDefinition {
  pub fn is_ssr_engine(&self) -> bool {
    self.function_id == SSR_ENGINE_ID
  }
}
