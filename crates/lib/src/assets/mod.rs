//! Asset classification and materialization.
//!
//! Static routes are partitioned into groups sharing the same content type and
//! resolved `cache-control` value. Each group becomes one upload unit with one
//! set of object metadata, instead of one upload per file.
//!
//! The group key is a short digest of `(content_type, cache_control)` only, so
//! two files with the same type and caching contract always share a group no
//! matter their paths or bytes.

mod write;

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use write::{AssetWriteError, AssetWriteReport, write_asset_groups};

use crate::route::StaticRoute;
use crate::util::hash::{ObjectHash, short_hash};
use crate::util::mime;

/// One file within an asset group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
  /// Location of the file as declared by the generator.
  pub source_file_path: PathBuf,
  /// Object key in storage, `/`-separated and without a leading slash.
  pub destination_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetGroup {
  pub hash: ObjectHash,
  pub content_type: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cache_control: Option<String>,
  pub assets: Vec<Asset>,
}

/// Compute the key of the group holding files with this type and caching contract.
pub fn group_hash(content_type: &str, cache_control: Option<&str>) -> ObjectHash {
  // The presence marker keeps `None` and `Some("")` apart.
  let key = match cache_control {
    Some(value) => format!("{content_type}\n1:{value}"),
    None => format!("{content_type}\n0:"),
  };
  short_hash(key.as_bytes())
}

/// Map a generator file path to its storage object key.
///
/// The generator's output root (e.g. `public`) is stripped when it is the
/// leading component; everything else is kept as-is.
pub fn destination_key(file_path: &Path, output_root: &Path) -> String {
  let rel = file_path.strip_prefix(output_root).unwrap_or(file_path);
  rel
    .components()
    .filter_map(|c| match c {
      Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
      _ => None,
    })
    .collect::<Vec<_>>()
    .join("/")
}

/// Partition resolved static routes into asset groups.
///
/// Groups appear in the order their first member was seen, and members keep
/// route order within a group, so identical input always produces identical
/// output.
pub fn classify<'a, I>(routes: I, output_root: &Path) -> Vec<AssetGroup>
where
  I: IntoIterator<Item = &'a StaticRoute>,
{
  let mut groups: Vec<AssetGroup> = Vec::new();
  let mut index: HashMap<ObjectHash, usize> = HashMap::new();

  for route in routes {
    let content_type = mime::from_path(&route.file_path);
    let cache_control = route.cache_control();
    let hash = group_hash(content_type, cache_control);

    let asset = Asset {
      source_file_path: route.file_path.clone(),
      destination_key: destination_key(&route.file_path, output_root),
    };

    match index.get(&hash) {
      Some(&pos) => groups[pos].assets.push(asset),
      None => {
        index.insert(hash.clone(), groups.len());
        groups.push(AssetGroup {
          hash,
          content_type: content_type.to_string(),
          cache_control: cache_control.map(str::to_string),
          assets: vec![asset],
        });
      }
    }
  }

  debug!(groups = groups.len(), "classified static assets");
  groups
}
