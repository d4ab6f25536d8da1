//! Compute executors for packaged functions.
//!
//! Three stages, each its own type:
//!
//! - [`ExecutorOptions`]: what the configuration file asks for.
//! - [`ExecutorSpec`]: options merged over defaults, ready to declare.
//! - [`Executor`]: a declared backend with its reachable endpoint, which is
//!   what the routing planner consumes.

mod options;
mod spec;

use serde::{Deserialize, Serialize};

pub use options::*;
pub use spec::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LambdaExecutor {
  pub function_id: String,
  pub name: String,
  /// Host name of the function's invocation URL.
  pub domain: String,
  pub provisioned_concurrency: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerExecutor {
  pub function_id: String,
  pub name: String,
  /// Host name of the service's load balancer.
  pub dns_name: String,
}

/// A provisioned backend for one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "kebab-case")]
pub enum Executor {
  Lambda(LambdaExecutor),
  Container(ContainerExecutor),
}

impl Executor {
  pub fn function_id(&self) -> &str {
    match self {
      Executor::Lambda(e) => &e.function_id,
      Executor::Container(e) => &e.function_id,
    }
  }

  pub fn name(&self) -> &str {
    match self {
      Executor::Lambda(e) => &e.name,
      Executor::Container(e) => &e.name,
    }
  }

  pub fn is_ssr_engine(&self) -> bool {
    self.function_id() == crate::consts::SSR_ENGINE_ID
  }
}
