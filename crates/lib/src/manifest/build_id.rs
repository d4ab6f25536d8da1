use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use super::BuildId;
use crate::util::hash::hash_bytes;

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a fresh build id.
///
/// Format: 13 hex digits of Unix milliseconds, a dash, then 8 hex digits of a
/// digest over the sub-millisecond clock, process id and a per-process
/// counter. Ids sort by creation time at millisecond resolution.
pub fn generate_build_id() -> BuildId {
  let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
  let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
  let entropy = format!("{}:{}:{}", now.as_nanos(), std::process::id(), seq);
  let suffix = hash_bytes(entropy.as_bytes()).0;
  BuildId(format!("{:013x}-{}", now.as_millis(), &suffix[..8]))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ids_are_unique() {
    let ids: std::collections::HashSet<_> = (0..1000).map(|_| generate_build_id()).collect();
    assert_eq!(ids.len(), 1000);
  }

  #[test]
  fn ids_have_fixed_shape() {
    let id = generate_build_id().0;
    let (millis, suffix) = id.split_once('-').unwrap();
    assert_eq!(millis.len(), 13);
    assert_eq!(suffix.len(), 8);
    assert!(id.chars().all(|c| c == '-' || c.is_ascii_hexdigit()));
  }

  #[test]
  fn later_ids_sort_after_earlier_ones() {
    let first = generate_build_id();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let second = generate_build_id();
    assert!(first < second);
  }
}
