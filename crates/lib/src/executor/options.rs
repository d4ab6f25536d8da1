//! User-facing executor options.
//!
//! Options are what the configuration file says about a function's compute
//! target. Every field is optional; unset fields fall back to the defaults
//! for the function's kind when the options are resolved into a spec.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Compute target selection for one function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "kebab-case")]
pub enum ExecutorOptions {
  /// Remove the function from routing entirely.
  Disabled,
  Lambda(LambdaOptions),
  Container(ContainerOptions),
}

impl ExecutorOptions {
  pub fn is_disabled(&self) -> bool {
    matches!(self, ExecutorOptions::Disabled)
  }

  pub fn is_container(&self) -> bool {
    matches!(self, ExecutorOptions::Container(_))
  }

  pub fn lambda() -> Self {
    ExecutorOptions::Lambda(LambdaOptions::default())
  }

  pub fn container() -> Self {
    ExecutorOptions::Container(ContainerOptions::default())
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LambdaOptions {
  pub timeout_secs: Option<u32>,
  pub memory_mb: Option<u32>,
  pub provisioned_concurrency: Option<u32>,
  pub architecture: Option<Architecture>,
  pub environment: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerOptions {
  pub cpu: Option<u32>,
  pub memory_mb: Option<u32>,
  pub desired_count: Option<u32>,
  pub port: Option<u16>,
  pub health_check_path: Option<String>,
  pub environment: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
  #[default]
  X86_64,
  Arm64,
}
