//! Manifest construction.
//!
//! Maps every route through header resolution, groups the resulting static
//! routes into asset groups, and forwards function definitions. Construction
//! is synchronous and total over well-formed input; reference checks live in
//! [`Manifest::validate`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{Manifest, MANIFEST_VERSION, generate_build_id};
use crate::assets::classify;
use crate::consts::GENERATOR_OUTPUT_ROOT;
use crate::headers::{CompiledRules, resolve_headers};
use crate::route::{FunctionDefinition, Route, StaticRoute};

pub struct ManifestBuilder {
  rules: CompiledRules,
  output_root: PathBuf,
}

impl ManifestBuilder {
  pub fn new(rules: CompiledRules) -> Self {
    Self {
      rules,
      output_root: PathBuf::from(GENERATOR_OUTPUT_ROOT),
    }
  }

  /// Override the generator output root stripped from asset object keys.
  pub fn with_output_root(mut self, root: impl AsRef<Path>) -> Self {
    self.output_root = root.as_ref().to_path_buf();
    self
  }

  pub fn build(&self, routes: Vec<Route>, functions: Vec<FunctionDefinition>) -> Manifest {
    let routes: Vec<Route> = routes.into_iter().map(|route| self.resolve_route(route)).collect();
    let asset_groups = classify(routes.iter().filter_map(Route::as_static), &self.output_root);
    let functions = retain_routed_functions(&routes, functions);

    let manifest = Manifest {
      version: MANIFEST_VERSION,
      build_id: generate_build_id(),
      routes,
      asset_groups,
      functions,
    };

    info!(
      build_id = %manifest.build_id,
      routes = manifest.routes.len(),
      asset_groups = manifest.asset_groups.len(),
      functions = manifest.functions.len(),
      "built manifest"
    );
    manifest
  }

  fn resolve_route(&self, route: Route) -> Route {
    match route {
      Route::Static(route) => {
        let headers = resolve_headers(&route.path, &route.headers, &self.rules);
        Route::Static(StaticRoute { headers, ..route })
      }
      other => other,
    }
  }
}

/// Keep functions referenced by at least one route, plus the SSR engine.
///
/// The SSR engine serves the catch-all route, which the generator never lists
/// as an explicit function route.
fn retain_routed_functions(routes: &[Route], functions: Vec<FunctionDefinition>) -> Vec<FunctionDefinition> {
  let referenced: HashSet<&str> = routes.iter().filter_map(Route::function_id).collect();
  functions
    .into_iter()
    .filter(|f| {
      let keep = f.is_ssr_engine() || referenced.contains(f.function_id.as_str());
      if !keep {
        debug!(function = %f.function_id, "dropping function not referenced by any route");
      }
      keep
    })
    .collect()
}

/// Build a manifest with the default generator output root.
pub fn build_manifest(routes: Vec<Route>, functions: Vec<FunctionDefinition>, rules: &CompiledRules) -> Manifest {
  ManifestBuilder::new(rules.clone()).build(routes, functions)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::consts::SSR_ENGINE_ID;
  use crate::headers::{CacheRule, CachePolicy, IMMUTABLE_DIRECTIVE, NO_CACHE_DIRECTIVE};
  use crate::route::{FunctionRoute, Header, RedirectRoute};

  fn static_route(path: &str) -> Route {
    Route::Static(StaticRoute {
      path: path.to_string(),
      file_path: PathBuf::from(format!("public{path}")),
      headers: vec![Header::new("x-frame-options", "DENY")],
    })
  }

  fn function(id: &str) -> FunctionDefinition {
    FunctionDefinition {
      function_id: id.to_string(),
      name: id.to_string(),
      required_files: vec![],
      entry_point: PathBuf::from(format!(".cache/functions/{id}.js")),
    }
  }

  fn sample_routes() -> Vec<Route> {
    vec![
      static_route("/app-abc123.js"),
      static_route("/a.css"),
      static_route("/b.css"),
      static_route("/page-data/app-data.json"),
      static_route("/index.html"),
      Route::Function(FunctionRoute {
        path: "/api/hello".to_string(),
        function_id: "hello".to_string(),
        cache: None,
      }),
      Route::Redirect(RedirectRoute {
        path: "/old".to_string(),
        to_path: "/new".to_string(),
        status: 301,
        headers: vec![],
      }),
    ]
  }

  fn builder() -> ManifestBuilder {
    ManifestBuilder::new(CompiledRules::with_builtins(&[]).unwrap())
  }

  #[test]
  fn static_routes_get_resolved_headers() {
    let manifest = builder().build(sample_routes(), vec![]);

    let js = manifest.static_routes().find(|r| r.path == "/app-abc123.js").unwrap();
    assert_eq!(js.headers, vec![Header::new("cache-control", IMMUTABLE_DIRECTIVE)]);

    let data = manifest
      .static_routes()
      .find(|r| r.path == "/page-data/app-data.json")
      .unwrap();
    assert_eq!(data.cache_control(), Some(NO_CACHE_DIRECTIVE));
  }

  #[test]
  fn non_static_routes_pass_through() {
    let manifest = builder().build(sample_routes(), vec![function("hello")]);
    assert_eq!(manifest.routes[5], sample_routes()[5]);
    assert_eq!(manifest.routes[6], sample_routes()[6]);
  }

  #[test]
  fn css_routes_share_one_group() {
    let manifest = builder().build(sample_routes(), vec![]);

    let css: Vec<_> = manifest
      .asset_groups
      .iter()
      .filter(|g| g.content_type.starts_with("text/css"))
      .collect();
    assert_eq!(css.len(), 1);
    assert_eq!(css[0].assets.len(), 2);
  }

  #[test]
  fn rebuilding_changes_only_the_build_id() {
    let first = builder().build(sample_routes(), vec![function("hello")]);
    let second = builder().build(sample_routes(), vec![function("hello")]);

    assert_eq!(first.routes, second.routes);
    assert_eq!(first.asset_groups, second.asset_groups);
    assert_eq!(first.functions, second.functions);
    assert_ne!(first.build_id, second.build_id);
  }

  #[test]
  fn ssr_engine_is_kept_without_routes() {
    let manifest = builder().build(
      sample_routes(),
      vec![function(SSR_ENGINE_ID), function("hello"), function("orphan")],
    );

    let ids: Vec<_> = manifest.functions.iter().map(|f| f.function_id.as_str()).collect();
    assert_eq!(ids, vec![SSR_ENGINE_ID, "hello"]);
  }

  #[test]
  fn user_rules_flow_into_groups() {
    let rules = CompiledRules::with_builtins(&[CacheRule::new("/*.html", CachePolicy::NoCache)]).unwrap();
    let manifest = ManifestBuilder::new(rules).build(sample_routes(), vec![]);

    let html = manifest.static_routes().find(|r| r.path == "/index.html").unwrap();
    assert_eq!(html.cache_control(), Some(NO_CACHE_DIRECTIVE));
  }

  #[test]
  fn custom_output_root_is_stripped() {
    let route = Route::Static(StaticRoute {
      path: "/x.js".to_string(),
      file_path: PathBuf::from("dist/x.js"),
      headers: vec![],
    });
    let manifest = builder().with_output_root("dist").build(vec![route], vec![]);
    assert_eq!(manifest.asset_groups[0].assets[0].destination_key, "x.js");
  }
}
