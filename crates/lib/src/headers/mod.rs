//! Header resolution for static routes.
//!
//! Resolution is a pure function of the route path, its existing headers and
//! the compiled rule table:
//!
//! 1. Drop headers on the strip list (security headers the CDN owns).
//! 2. Append one `cache-control` header per matching rule, in table order.
//! 3. Deduplicate by lowercased key; the last value written wins and keeps the
//!    position of the key's first occurrence.
//!
//! Header keys are normalized to lowercase, so the output never carries two
//! keys that differ only by case.

mod rules;

use std::collections::HashMap;

pub use rules::*;

use crate::route::Header;

/// Headers the generator adds on its own that the CDN response policy sets instead.
pub const STRIPPED_HEADERS: &[&str] = &[
  "x-xss-protection",
  "x-content-type-options",
  "referrer-policy",
  "x-frame-options",
];

pub const CACHE_CONTROL: &str = "cache-control";

/// Resolve the final header set for a route.
pub fn resolve_headers(path: &str, existing: &[Header], rules: &CompiledRules) -> Vec<Header> {
  let mut headers: Vec<Header> = existing
    .iter()
    .filter(|h| !is_stripped(&h.key))
    .cloned()
    .collect();

  headers.extend(rules.matching(path).map(|policy| Header::new(CACHE_CONTROL, policy.directive())));

  dedupe_headers(headers)
}

fn is_stripped(key: &str) -> bool {
  STRIPPED_HEADERS.iter().any(|s| s.eq_ignore_ascii_case(key))
}

/// Deduplicate headers case-insensitively, last value wins.
pub fn dedupe_headers(headers: Vec<Header>) -> Vec<Header> {
  let mut out: Vec<Header> = Vec::with_capacity(headers.len());
  let mut index: HashMap<String, usize> = HashMap::new();

  for header in headers {
    let key = header.key.to_ascii_lowercase();
    match index.get(&key) {
      Some(&pos) => out[pos].value = header.value,
      None => {
        index.insert(key.clone(), out.len());
        out.push(Header::new(key, header.value));
      }
    }
  }

  out
}
