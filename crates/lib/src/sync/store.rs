//! Object storage seam.

use std::collections::BTreeMap;
use std::future::Future;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::WalkDir;

use crate::util::fs::to_url_path;

const OBJECTS_DIR: &str = "objects";
const METADATA_DIR: &str = ".metadata";

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("invalid object key {0:?}")]
  InvalidKey(String),

  #[error("I/O error for {key}: {source}")]
  Io {
    key: String,
    #[source]
    source: io::Error,
  },

  #[error("corrupt metadata for {key}: {source}")]
  Metadata {
    key: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("{0}")]
  Backend(String),
}

/// Metadata stored with every object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
  pub content_type: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cache_control: Option<String>,
  /// SHA-256 of the body, used to skip unchanged uploads.
  pub content_hash: String,
}

/// A key/value object store such as the asset bucket.
pub trait ObjectStore: Send + Sync {
  fn list(&self) -> impl Future<Output = Result<BTreeMap<String, ObjectMetadata>, StoreError>> + Send;

  fn put(&self, key: &str, body: Vec<u8>, metadata: &ObjectMetadata) -> impl Future<Output = Result<(), StoreError>> + Send;

  fn delete(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Directory-backed store.
///
/// ```text
/// <root>/objects/<key>
/// <root>/.metadata/<key>.json
/// ```
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
  root: PathBuf,
}

impl LocalObjectStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn object_path(&self, key: &str) -> Result<PathBuf, StoreError> {
    Ok(self.root.join(OBJECTS_DIR).join(checked_key(key)?))
  }

  fn metadata_path(&self, key: &str) -> Result<PathBuf, StoreError> {
    Ok(self.root.join(METADATA_DIR).join(format!("{}.json", checked_key(key)?.display())))
  }
}

/// Keys are relative, `/`-separated and never climb out of the store.
fn checked_key(key: &str) -> Result<PathBuf, StoreError> {
  let path = Path::new(key);
  let valid = !key.is_empty()
    && !key.starts_with('/')
    && path.components().all(|c| matches!(c, Component::Normal(_)));
  if valid {
    Ok(path.to_path_buf())
  } else {
    Err(StoreError::InvalidKey(key.to_string()))
  }
}

fn io_err(key: &str) -> impl FnOnce(io::Error) -> StoreError + '_ {
  move |source| StoreError::Io {
    key: key.to_string(),
    source,
  }
}

impl ObjectStore for LocalObjectStore {
  async fn list(&self) -> Result<BTreeMap<String, ObjectMetadata>, StoreError> {
    let root = self.root.clone();
    tokio::task::spawn_blocking(move || list_dir(&root))
      .await
      .map_err(|e| StoreError::Backend(e.to_string()))?
  }

  async fn put(&self, key: &str, body: Vec<u8>, metadata: &ObjectMetadata) -> Result<(), StoreError> {
    let object = self.object_path(key)?;
    let sidecar = self.metadata_path(key)?;
    let meta = serde_json::to_vec_pretty(metadata).map_err(|source| StoreError::Metadata {
      key: key.to_string(),
      source,
    })?;

    for path in [&object, &sidecar] {
      if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err(key))?;
      }
    }
    tokio::fs::write(&object, body).await.map_err(io_err(key))?;
    tokio::fs::write(&sidecar, meta).await.map_err(io_err(key))
  }

  async fn delete(&self, key: &str) -> Result<(), StoreError> {
    for path in [self.object_path(key)?, self.metadata_path(key)?] {
      match tokio::fs::remove_file(&path).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(key)(e)),
      }
    }
    Ok(())
  }
}

fn list_dir(root: &Path) -> Result<BTreeMap<String, ObjectMetadata>, StoreError> {
  let objects = root.join(OBJECTS_DIR);
  let mut listing = BTreeMap::new();
  if !objects.is_dir() {
    return Ok(listing);
  }

  for entry in WalkDir::new(&objects).min_depth(1) {
    let entry = entry.map_err(|e| io_err("<listing>")(io::Error::other(e)))?;
    if !entry.file_type().is_file() {
      continue;
    }
    let rel = entry.path().strip_prefix(&objects).unwrap_or(entry.path());
    let key = to_url_path(rel).trim_start_matches('/').to_string();

    let sidecar = root.join(METADATA_DIR).join(format!("{}.json", rel.display()));
    let metadata = match std::fs::read(&sidecar) {
      Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Metadata {
        key: key.clone(),
        source,
      })?,
      // An object without metadata never matches, so it gets rewritten.
      Err(e) if e.kind() == io::ErrorKind::NotFound => ObjectMetadata {
        content_type: String::new(),
        cache_control: None,
        content_hash: String::new(),
      },
      Err(e) => return Err(io_err(&key)(e)),
    };
    listing.insert(key, metadata);
  }

  Ok(listing)
}
