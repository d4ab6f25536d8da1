//! Routing and cache-behavior planning.
//!
//! The plan is a pure derivation over the provisioned executors and the asset
//! bucket:
//!
//! | SSR engine executor | Default behavior origin                         | Page-data behavior      |
//! |---------------------|-------------------------------------------------|-------------------------|
//! | absent              | bucket, directory-index rewrite                 | none                    |
//! | Lambda              | SSR function URL                                | SSR, prefix stripped    |
//! | Container           | SSR load balancer                               | SSR, prefix stripped    |
//!
//! The assets prefix always routes to the bucket with its prefix stripped and
//! the directory-index rewrite applied. Every other function gets a behavior
//! keyed by its name.
//!
//! Overrides from configuration are merged per route class through the
//! three-tier merge. The derived origin, path pattern and viewer rewrites sit
//! in the protected tier.

mod types;
mod viewer;

use std::collections::HashSet;

use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

pub use types::*;
pub use viewer::render_viewer_function;

use crate::config::{Layers, MergeError};
use crate::executor::Executor;
use crate::headers::{CACHE_CONTROL, dedupe_headers};
use crate::route::Header;

pub const NO_STORE: &str = "no-store";

#[derive(Debug, Error)]
pub enum RoutingError {
  #[error("assets prefix {0:?} must start with '/' and name at least one segment")]
  InvalidAssetsPrefix(String),

  #[error("functions {first} and {second} both route {path_pattern}")]
  DuplicatePathPattern {
    path_pattern: String,
    first: String,
    second: String,
  },

  #[error("invalid {class} behavior override: {source}")]
  Override {
    class: RouteClass,
    #[source]
    source: MergeError,
  },
}

/// The static-asset bucket as an origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketOrigin {
  pub bucket: String,
  pub domain: String,
}

pub struct PlanInput<'a> {
  pub bucket: &'a BucketOrigin,
  pub executors: &'a [Executor],
  pub assets_prefix: &'a str,
  pub overrides: &'a BehaviorOverrides,
  pub disable_caching: bool,
}

/// Derive the distribution's behaviors.
pub fn plan_distribution(input: &PlanInput<'_>) -> Result<DistributionPlan, RoutingError> {
  let prefix = normalize_prefix(input.assets_prefix)?;
  let bucket = Origin::Bucket {
    bucket: input.bucket.bucket.clone(),
    domain: input.bucket.domain.clone(),
  };
  let ssr = input.executors.iter().find(|e| e.is_ssr_engine());

  let mut behaviors = Vec::new();
  let mut seen: Vec<(String, String)> = Vec::new();

  for executor in input.executors.iter().filter(|e| !e.is_ssr_engine()) {
    let path_pattern = function_pattern(executor.name());
    if let Some((_, first)) = seen.iter().find(|(p, _)| *p == path_pattern) {
      return Err(RoutingError::DuplicatePathPattern {
        path_pattern,
        first: first.clone(),
        second: executor.function_id().to_string(),
      });
    }
    seen.push((path_pattern.clone(), executor.function_id().to_string()));

    let derived = function_behavior(Some(path_pattern), executor.into(), RouteClass::Functions);
    behaviors.push(finish(derived, input)?);
  }

  if let Some(ssr) = ssr {
    let derived = CacheBehavior {
      viewer_rewrites: vec![ViewerRewrite::StripPrefix { prefix: prefix.clone() }],
      ..ssr_behavior(Some(format!("{prefix}/page-data/*")), ssr.into(), RouteClass::PageData)
    };
    behaviors.push(finish(derived, input)?);
  }

  let assets = CacheBehavior {
    viewer_rewrites: vec![
      ViewerRewrite::StripPrefix { prefix: prefix.clone() },
      ViewerRewrite::DirectoryIndex,
    ],
    ..bucket_behavior(Some(format!("{prefix}/*")), bucket.clone(), RouteClass::Assets)
  };
  behaviors.push(finish(assets, input)?);

  let default_behavior = match ssr {
    Some(ssr) => ssr_behavior(None, ssr.into(), RouteClass::Default),
    None => CacheBehavior {
      viewer_rewrites: vec![ViewerRewrite::DirectoryIndex],
      ..bucket_behavior(None, bucket, RouteClass::Default)
    },
  };
  let default_behavior = finish(default_behavior, input)?;

  info!(
    behaviors = behaviors.len(),
    ssr = ssr.is_some(),
    caching = !input.disable_caching,
    "planned distribution"
  );

  Ok(DistributionPlan {
    default_behavior,
    behaviors,
  })
}

fn normalize_prefix(prefix: &str) -> Result<String, RoutingError> {
  let trimmed = prefix.trim_end_matches('/');
  if !trimmed.starts_with('/') || trimmed.len() < 2 || trimmed.contains('*') {
    return Err(RoutingError::InvalidAssetsPrefix(prefix.to_string()));
  }
  Ok(trimmed.to_string())
}

fn function_pattern(name: &str) -> String {
  format!("/{}", name.trim_start_matches('/'))
}

fn bucket_behavior(path_pattern: Option<String>, origin: Origin, class: RouteClass) -> CacheBehavior {
  CacheBehavior {
    class,
    path_pattern,
    origin,
    cache_policy: CdnCachePolicy::CachingOptimized,
    origin_request_policy: None,
    response_headers_policy: ResponseHeadersPolicy::SecurityHeaders,
    response_header_overrides: Vec::new(),
    viewer_rewrites: Vec::new(),
    edge_hooks: Vec::new(),
    allowed_methods: AllowedMethods::GetHead,
    compress: true,
  }
}

fn ssr_behavior(path_pattern: Option<String>, origin: Origin, class: RouteClass) -> CacheBehavior {
  CacheBehavior {
    cache_policy: CdnCachePolicy::UseOriginCacheControl,
    origin_request_policy: Some(OriginRequestPolicy::AllViewerExceptHost),
    allowed_methods: AllowedMethods::All,
    ..bucket_behavior(path_pattern, origin, class)
  }
}

fn function_behavior(path_pattern: Option<String>, origin: Origin, class: RouteClass) -> CacheBehavior {
  CacheBehavior {
    cache_policy: CdnCachePolicy::CachingDisabled,
    ..ssr_behavior(path_pattern, origin, class)
  }
}

/// Apply the class override, then the caching kill switch.
fn finish(derived: CacheBehavior, input: &PlanInput<'_>) -> Result<CacheBehavior, RoutingError> {
  let class = derived.class;
  let merge = |derived: &CacheBehavior| -> Result<CacheBehavior, MergeError> {
    Layers::new(derived)?
      .user(input.overrides.for_class(class))?
      .protected(&json!({
        "class": derived.class,
        "path_pattern": derived.path_pattern,
        "origin": derived.origin,
        "viewer_rewrites": derived.viewer_rewrites,
      }))?
      .resolve()
  };
  let mut behavior = merge(&derived).map_err(|source| RoutingError::Override { class, source })?;

  if input.disable_caching {
    disable_caching(&mut behavior);
  }

  debug!(
    class = %behavior.class,
    path_pattern = behavior.path_pattern.as_deref().unwrap_or("*"),
    "planned behavior"
  );
  Ok(behavior)
}

/// Neutralize both CDN caching and browser caching for a behavior.
fn disable_caching(behavior: &mut CacheBehavior) {
  behavior.cache_policy = CdnCachePolicy::CachingDisabled;
  let mut headers = std::mem::take(&mut behavior.response_header_overrides);
  headers.push(Header::new(CACHE_CONTROL, NO_STORE));
  behavior.response_header_overrides = dedupe_headers(headers);
}

/// Path patterns in the plan, in evaluation order.
pub fn path_patterns(plan: &DistributionPlan) -> Vec<&str> {
  let mut seen = HashSet::new();
  plan
    .behaviors
    .iter()
    .filter_map(|b| b.path_pattern.as_deref())
    .filter(|p| seen.insert(*p))
    .collect()
}
