//! Cache-control rule tables.
//!
//! A rule maps a glob pattern (matched against the route path) to a
//! [`CachePolicy`]. Tables are merged from the built-in defaults and the
//! caller's configuration before being compiled into a [`CompiledRules`].

use serde::{Deserialize, Serialize};

use crate::util::glob::{Glob, GlobError};

/// `cache-control` value for content-hashed files that never change.
pub const IMMUTABLE_DIRECTIVE: &str = "public, max-age=31536000, immutable";

/// `cache-control` value for files that must be revalidated on every request.
pub const NO_CACHE_DIRECTIVE: &str = "public, max-age=0, must-revalidate";

/// What a matching rule contributes to a route's `cache-control` header.
///
/// In configuration files the strings `immutable`/`IMMUTABLE` and
/// `no-cache`/`NO_CACHE` select the named policies; any other string is used
/// verbatim, e.g. `"public, max-age=0, s-maxage=600"` for CDN-only caching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CachePolicy {
  Immutable,
  NoCache,
  Literal(String),
}

impl CachePolicy {
  pub fn directive(&self) -> &str {
    match self {
      CachePolicy::Immutable => IMMUTABLE_DIRECTIVE,
      CachePolicy::NoCache => NO_CACHE_DIRECTIVE,
      CachePolicy::Literal(value) => value,
    }
  }
}

impl From<String> for CachePolicy {
  fn from(value: String) -> Self {
    match value.as_str() {
      "immutable" | "IMMUTABLE" => CachePolicy::Immutable,
      "no-cache" | "NO_CACHE" => CachePolicy::NoCache,
      _ => CachePolicy::Literal(value),
    }
  }
}

impl From<CachePolicy> for String {
  fn from(policy: CachePolicy) -> Self {
    match policy {
      CachePolicy::Immutable => "immutable".to_string(),
      CachePolicy::NoCache => "no-cache".to_string(),
      CachePolicy::Literal(value) => value,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheRule {
  pub pattern: String,
  pub policy: CachePolicy,
}

impl CacheRule {
  pub fn new(pattern: impl Into<String>, policy: CachePolicy) -> Self {
    Self {
      pattern: pattern.into(),
      policy,
    }
  }
}

/// Rules applied to every build unless overridden.
pub fn builtin_rules() -> Vec<CacheRule> {
  vec![
    CacheRule::new("/*.js", CachePolicy::Immutable),
    CacheRule::new("/*.js.map", CachePolicy::Immutable),
    CacheRule::new("/*.css", CachePolicy::Immutable),
    CacheRule::new("/page-data/**", CachePolicy::NoCache),
  ]
}

/// Merge caller rules over a base table.
///
/// A caller rule whose pattern equals a base pattern replaces the base policy
/// in place. Other caller rules are appended after the base table, so when
/// several patterns match one path the caller's contribution is applied last
/// and wins deduplication.
pub fn merge_rules(base: &[CacheRule], user: &[CacheRule]) -> Vec<CacheRule> {
  let mut merged = base.to_vec();
  for rule in user {
    match merged.iter_mut().find(|r| r.pattern == rule.pattern) {
      Some(existing) => existing.policy = rule.policy.clone(),
      None => merged.push(rule.clone()),
    }
  }
  merged
}

/// A rule table with every pattern compiled, ready for resolution.
#[derive(Debug, Clone, Default)]
pub struct CompiledRules {
  rules: Vec<(Glob, CachePolicy)>,
}

impl CompiledRules {
  pub fn compile(rules: &[CacheRule]) -> Result<Self, GlobError> {
    let rules = rules
      .iter()
      .map(|r| Ok((Glob::new(&r.pattern)?, r.policy.clone())))
      .collect::<Result<Vec<_>, GlobError>>()?;
    Ok(Self { rules })
  }

  /// Built-in rules merged with the caller's rules, compiled.
  pub fn with_builtins(user: &[CacheRule]) -> Result<Self, GlobError> {
    Self::compile(&merge_rules(&builtin_rules(), user))
  }

  /// Every policy whose pattern matches `path`, in table order.
  pub fn matching<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a CachePolicy> + 'a {
    self
      .rules
      .iter()
      .filter(move |(glob, _)| glob.is_match(path))
      .map(|(_, policy)| policy)
  }

  pub fn len(&self) -> usize {
    self.rules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }
}
