//! CDN routing plan types.

use serde::{Deserialize, Serialize};

use crate::executor::Executor;
use crate::route::Header;

/// The class a behavior belongs to, used to look up overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
  Default,
  Assets,
  Functions,
  PageData,
}

impl std::fmt::Display for RouteClass {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      RouteClass::Default => "default",
      RouteClass::Assets => "assets",
      RouteClass::Functions => "functions",
      RouteClass::PageData => "page_data",
    };
    f.write_str(name)
  }
}

/// Where the CDN forwards a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Origin {
  Bucket { bucket: String, domain: String },
  FunctionUrl { function_id: String, domain: String },
  LoadBalancer { function_id: String, dns_name: String },
}

impl Origin {
  pub fn is_bucket(&self) -> bool {
    matches!(self, Origin::Bucket { .. })
  }
}

impl From<&Executor> for Origin {
  fn from(executor: &Executor) -> Self {
    match executor {
      Executor::Lambda(e) => Origin::FunctionUrl {
        function_id: e.function_id.clone(),
        domain: e.domain.clone(),
      },
      Executor::Container(e) => Origin::LoadBalancer {
        function_id: e.function_id.clone(),
        dns_name: e.dns_name.clone(),
      },
    }
  }
}

/// A URI rewrite applied by a viewer-request edge function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ViewerRewrite {
  /// `/dir/` → `/dir/index.html`, `/page` → `/page/index.html`.
  DirectoryIndex,
  /// `/<prefix>/x` → `/x`.
  StripPrefix { prefix: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CdnCachePolicy {
  CachingOptimized,
  CachingDisabled,
  UseOriginCacheControl,
  Custom(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginRequestPolicy {
  AllViewer,
  AllViewerExceptHost,
  CorsS3Origin,
  Custom(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseHeadersPolicy {
  SecurityHeaders,
  CorsWithPreflightAndSecurityHeaders,
  Custom(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllowedMethods {
  GetHead,
  GetHeadOptions,
  All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeEvent {
  ViewerRequest,
  ViewerResponse,
  OriginRequest,
  OriginResponse,
}

/// A user-supplied edge function association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgeHook {
  pub event: EdgeEvent,
  pub function_arn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheBehavior {
  pub class: RouteClass,
  /// `None` for the default behavior.
  pub path_pattern: Option<String>,
  pub origin: Origin,
  pub cache_policy: CdnCachePolicy,
  pub origin_request_policy: Option<OriginRequestPolicy>,
  pub response_headers_policy: ResponseHeadersPolicy,
  pub response_header_overrides: Vec<Header>,
  pub viewer_rewrites: Vec<ViewerRewrite>,
  pub edge_hooks: Vec<EdgeHook>,
  pub allowed_methods: AllowedMethods,
  pub compress: bool,
}

/// Settings a configuration file may change on one route class.
///
/// Origins, path patterns and viewer rewrites are derived and cannot be
/// overridden.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BehaviorOverride {
  pub cache_policy: Option<CdnCachePolicy>,
  pub origin_request_policy: Option<OriginRequestPolicy>,
  pub response_headers_policy: Option<ResponseHeadersPolicy>,
  pub response_header_overrides: Option<Vec<Header>>,
  pub edge_hooks: Option<Vec<EdgeHook>>,
  pub allowed_methods: Option<AllowedMethods>,
  pub compress: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BehaviorOverrides {
  pub default: Option<BehaviorOverride>,
  pub assets: Option<BehaviorOverride>,
  pub functions: Option<BehaviorOverride>,
  pub page_data: Option<BehaviorOverride>,
}

impl BehaviorOverrides {
  pub fn for_class(&self, class: RouteClass) -> Option<&BehaviorOverride> {
    match class {
      RouteClass::Default => self.default.as_ref(),
      RouteClass::Assets => self.assets.as_ref(),
      RouteClass::Functions => self.functions.as_ref(),
      RouteClass::PageData => self.page_data.as_ref(),
    }
  }
}

/// The complete routing plan for one distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionPlan {
  pub default_behavior: CacheBehavior,
  /// Additional behaviors, most specific first.
  pub behaviors: Vec<CacheBehavior>,
}

impl DistributionPlan {
  /// Every behavior, default last.
  pub fn all_behaviors(&self) -> impl Iterator<Item = &CacheBehavior> {
    self.behaviors.iter().chain(std::iter::once(&self.default_behavior))
  }

  pub fn behavior(&self, path_pattern: &str) -> Option<&CacheBehavior> {
    self
      .behaviors
      .iter()
      .find(|b| b.path_pattern.as_deref() == Some(path_pattern))
  }
}
