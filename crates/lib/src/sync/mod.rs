//! Asset sync: mirror materialized asset groups into an object store.
//!
//! Every asset is uploaded with its group's content type and cache-control
//! unless the store already holds identical bytes and metadata. Keys in the
//! store that no longer belong to any group are deleted. Operations run
//! concurrently under a semaphore; a failed operation is retried, then
//! recorded, and never stops the others.

mod store;

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

pub use store::*;

use crate::assets::AssetGroup;
use crate::util::hash::hash_bytes;

const RETRY_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum SyncError {
  #[error("failed to list objects: {0}")]
  List(#[source] StoreError),

  #[error("{}", partial_message(.report))]
  Partial { report: SyncReport },
}

fn partial_message(report: &SyncReport) -> String {
  let keys: Vec<&str> = report.failures.iter().map(|f| f.key.as_str()).collect();
  format!("{} object operation(s) failed: {}", keys.len(), keys.join(", "))
}

/// `[sync]` configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
  /// Object operations in flight at once.
  pub concurrency: usize,
  /// Extra attempts per failed operation.
  pub retries: u32,
  /// Delete store keys that no asset group owns.
  pub delete_stale: bool,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      concurrency: 8,
      retries: 2,
      delete_stale: true,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
  Upload,
  Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
  pub key: String,
  pub operation: SyncOperation,
  pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
  pub uploaded: usize,
  pub unchanged: usize,
  pub deleted: usize,
  /// Assets whose materialized file was not found locally.
  pub missing: usize,
  pub failures: Vec<SyncFailure>,
}

enum Outcome {
  Uploaded,
  Unchanged,
  Deleted,
  Missing,
  Failed(SyncFailure),
}

struct Upload {
  key: String,
  file: PathBuf,
  content_type: String,
  cache_control: Option<String>,
}

/// Sync `groups`, materialized under `assets_dir/<hash>/<key>`, into `store`.
pub async fn sync_asset_groups<S>(
  groups: &[AssetGroup],
  assets_dir: &Path,
  store: Arc<S>,
  config: &SyncConfig,
) -> Result<SyncReport, SyncError>
where
  S: ObjectStore + 'static,
{
  let existing = Arc::new(store.list().await.map_err(SyncError::List)?);

  let mut uploads: BTreeMap<String, Upload> = BTreeMap::new();
  for group in groups {
    for asset in &group.assets {
      uploads.insert(
        asset.destination_key.clone(),
        Upload {
          key: asset.destination_key.clone(),
          file: assets_dir.join(&group.hash.0).join(&asset.destination_key),
          content_type: group.content_type.clone(),
          cache_control: group.cache_control.clone(),
        },
      );
    }
  }

  let stale: Vec<String> = if config.delete_stale {
    existing.keys().filter(|k| !uploads.contains_key(*k)).cloned().collect()
  } else {
    Vec::new()
  };

  debug!(
    uploads = uploads.len(),
    stale = stale.len(),
    existing = existing.len(),
    "planned sync"
  );

  let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
  let retries = config.retries;
  let mut join_set = JoinSet::new();

  for upload in uploads.into_values() {
    let store = store.clone();
    let existing = existing.clone();
    let semaphore = semaphore.clone();
    join_set.spawn(async move {
      let Ok(_permit) = semaphore.acquire().await else {
        return Outcome::Failed(failure(&upload.key, SyncOperation::Upload, "sync cancelled"));
      };
      upload_one(store.as_ref(), &existing, upload, retries).await
    });
  }

  for key in stale {
    let store = store.clone();
    let semaphore = semaphore.clone();
    join_set.spawn(async move {
      let Ok(_permit) = semaphore.acquire().await else {
        return Outcome::Failed(failure(&key, SyncOperation::Delete, "sync cancelled"));
      };
      match with_retries(retries, &key, || store.delete(&key)).await {
        Ok(()) => {
          debug!(key = %key, "deleted stale object");
          Outcome::Deleted
        }
        Err(e) => Outcome::Failed(failure(&key, SyncOperation::Delete, &e.to_string())),
      }
    });
  }

  let mut report = SyncReport::default();
  while let Some(joined) = join_set.join_next().await {
    match joined {
      Ok(Outcome::Uploaded) => report.uploaded += 1,
      Ok(Outcome::Unchanged) => report.unchanged += 1,
      Ok(Outcome::Deleted) => report.deleted += 1,
      Ok(Outcome::Missing) => report.missing += 1,
      Ok(Outcome::Failed(f)) => report.failures.push(f),
      Err(e) => {
        error!(error = %e, "sync task panicked");
        report
          .failures
          .push(failure("<unknown>", SyncOperation::Upload, &e.to_string()));
      }
    }
  }
  report.failures.sort_by(|a, b| a.key.cmp(&b.key));

  info!(
    uploaded = report.uploaded,
    unchanged = report.unchanged,
    deleted = report.deleted,
    missing = report.missing,
    failed = report.failures.len(),
    "synced assets"
  );

  if report.failures.is_empty() {
    Ok(report)
  } else {
    Err(SyncError::Partial { report })
  }
}

async fn upload_one<S: ObjectStore>(
  store: &S,
  existing: &BTreeMap<String, ObjectMetadata>,
  upload: Upload,
  retries: u32,
) -> Outcome {
  let body = match tokio::fs::read(&upload.file).await {
    Ok(body) => body,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
      warn!(key = %upload.key, file = %upload.file.display(), "materialized asset missing, skipping");
      return Outcome::Missing;
    }
    Err(e) => return Outcome::Failed(failure(&upload.key, SyncOperation::Upload, &e.to_string())),
  };

  let metadata = ObjectMetadata {
    content_type: upload.content_type,
    cache_control: upload.cache_control,
    content_hash: hash_bytes(&body).0,
  };

  if existing.get(&upload.key) == Some(&metadata) {
    return Outcome::Unchanged;
  }

  match with_retries(retries, &upload.key, || store.put(&upload.key, body.clone(), &metadata)).await {
    Ok(()) => {
      debug!(key = %upload.key, bytes = body.len(), "uploaded object");
      Outcome::Uploaded
    }
    Err(e) => Outcome::Failed(failure(&upload.key, SyncOperation::Upload, &e.to_string())),
  }
}

async fn with_retries<F, Fut>(retries: u32, key: &str, mut op: F) -> Result<(), StoreError>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<(), StoreError>>,
{
  let mut attempt = 0;
  loop {
    match op().await {
      Ok(()) => return Ok(()),
      Err(e) if attempt < retries => {
        attempt += 1;
        warn!(key, attempt, error = %e, "object operation failed, retrying");
        tokio::time::sleep(RETRY_BACKOFF * attempt).await;
      }
      Err(e) => return Err(e),
    }
  }
}

fn failure(key: &str, operation: SyncOperation, message: &str) -> SyncFailure {
  SyncFailure {
    key: key.to_string(),
    operation,
    message: message.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::assets::{Asset, group_hash};
  use std::collections::{HashMap, HashSet};
  use std::sync::Mutex;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use tempfile::TempDir;

  /// In-memory store with scripted failures.
  #[derive(Default)]
  struct MemoryStore {
    objects: Mutex<BTreeMap<String, (Vec<u8>, ObjectMetadata)>>,
    /// Keys that fail this many more times before succeeding.
    flaky: Mutex<HashMap<String, usize>>,
    broken: HashSet<String>,
    puts: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
  }

  impl MemoryStore {
    fn check(&self, key: &str) -> Result<(), StoreError> {
      if self.broken.contains(key) {
        return Err(StoreError::Backend(format!("{key} is broken")));
      }
      let mut flaky = self.flaky.lock().unwrap();
      match flaky.get_mut(key) {
        Some(remaining) if *remaining > 0 => {
          *remaining -= 1;
          Err(StoreError::Backend(format!("{key} flaked")))
        }
        _ => Ok(()),
      }
    }
  }

  impl ObjectStore for MemoryStore {
    async fn list(&self) -> Result<BTreeMap<String, ObjectMetadata>, StoreError> {
      Ok(
        self
          .objects
          .lock()
          .unwrap()
          .iter()
          .map(|(k, (_, m))| (k.clone(), m.clone()))
          .collect(),
      )
    }

    async fn put(&self, key: &str, body: Vec<u8>, metadata: &ObjectMetadata) -> Result<(), StoreError> {
      let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
      self.max_in_flight.fetch_max(now, Ordering::SeqCst);
      tokio::time::sleep(Duration::from_millis(5)).await;
      self.in_flight.fetch_sub(1, Ordering::SeqCst);

      self.check(key)?;
      self.puts.fetch_add(1, Ordering::SeqCst);
      self
        .objects
        .lock()
        .unwrap()
        .insert(key.to_string(), (body, metadata.clone()));
      Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
      self.check(key)?;
      self.objects.lock().unwrap().remove(key);
      Ok(())
    }
  }

  struct Fixture {
    _temp: TempDir,
    assets_dir: PathBuf,
    groups: Vec<AssetGroup>,
  }

  /// One CSS group with `count` files, materialized on disk.
  fn fixture(count: usize) -> Fixture {
    let temp = TempDir::new().unwrap();
    let assets_dir = temp.path().join("assets");
    let hash = group_hash("text/css; charset=utf-8", Some("public, max-age=31536000, immutable"));

    let assets: Vec<Asset> = (0..count)
      .map(|i| {
        let key = format!("css/{i}.css");
        let file = assets_dir.join(&hash.0).join(&key);
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, format!(".c{i} {{}}")).unwrap();
        Asset {
          source_file_path: PathBuf::from(format!("public/{key}")),
          destination_key: key,
        }
      })
      .collect();

    Fixture {
      _temp: temp,
      assets_dir,
      groups: vec![AssetGroup {
        hash,
        content_type: "text/css; charset=utf-8".to_string(),
        cache_control: Some("public, max-age=31536000, immutable".to_string()),
        assets,
      }],
    }
  }

  fn config(retries: u32) -> SyncConfig {
    SyncConfig {
      concurrency: 3,
      retries,
      delete_stale: true,
    }
  }

  #[tokio::test]
  async fn uploads_with_group_metadata() {
    let fixture = fixture(2);
    let store = Arc::new(MemoryStore::default());

    let report = sync_asset_groups(&fixture.groups, &fixture.assets_dir, store.clone(), &config(0))
      .await
      .unwrap();

    assert_eq!(report.uploaded, 2);
    let objects = store.objects.lock().unwrap();
    let (body, meta) = &objects["css/0.css"];
    assert_eq!(body, b".c0 {}");
    assert_eq!(meta.content_type, "text/css; charset=utf-8");
    assert_eq!(meta.cache_control.as_deref(), Some("public, max-age=31536000, immutable"));
    assert_eq!(meta.content_hash, hash_bytes(b".c0 {}").0);
  }

  #[tokio::test]
  async fn second_sync_skips_unchanged_and_deletes_stale() {
    let fixture = fixture(2);
    let store = Arc::new(MemoryStore::default());
    sync_asset_groups(&fixture.groups, &fixture.assets_dir, store.clone(), &config(0))
      .await
      .unwrap();
    store.objects.lock().unwrap().insert(
      "old.css".to_string(),
      (
        vec![],
        ObjectMetadata {
          content_type: "text/css".to_string(),
          cache_control: None,
          content_hash: String::new(),
        },
      ),
    );

    let report = sync_asset_groups(&fixture.groups, &fixture.assets_dir, store.clone(), &config(0))
      .await
      .unwrap();

    assert_eq!(report.uploaded, 0);
    assert_eq!(report.unchanged, 2);
    assert_eq!(report.deleted, 1);
    assert!(!store.objects.lock().unwrap().contains_key("old.css"));
    assert_eq!(store.puts.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn stale_keys_survive_when_deletion_is_off() {
    let fixture = fixture(1);
    let store = Arc::new(MemoryStore::default());
    store.objects.lock().unwrap().insert(
      "keep.txt".to_string(),
      (
        vec![],
        ObjectMetadata {
          content_type: "text/plain".to_string(),
          cache_control: None,
          content_hash: String::new(),
        },
      ),
    );

    let config = SyncConfig {
      delete_stale: false,
      ..config(0)
    };
    let report = sync_asset_groups(&fixture.groups, &fixture.assets_dir, store.clone(), &config)
      .await
      .unwrap();
    assert_eq!(report.deleted, 0);
    assert!(store.objects.lock().unwrap().contains_key("keep.txt"));
  }

  #[tokio::test]
  async fn one_failure_does_not_stop_the_rest() {
    let fixture = fixture(5);
    let store = Arc::new(MemoryStore {
      broken: HashSet::from(["css/2.css".to_string()]),
      ..Default::default()
    });

    let err = sync_asset_groups(&fixture.groups, &fixture.assets_dir, store.clone(), &config(1))
      .await
      .unwrap_err();

    let SyncError::Partial { report } = err else {
      panic!("expected partial failure");
    };
    assert_eq!(report.uploaded, 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].key, "css/2.css");
    assert_eq!(report.failures[0].operation, SyncOperation::Upload);
    assert_eq!(store.objects.lock().unwrap().len(), 4);
  }

  #[tokio::test]
  async fn transient_failures_are_retried() {
    let fixture = fixture(1);
    let store = Arc::new(MemoryStore {
      flaky: Mutex::new(HashMap::from([("css/0.css".to_string(), 1)])),
      ..Default::default()
    });

    let report = sync_asset_groups(&fixture.groups, &fixture.assets_dir, store.clone(), &config(1))
      .await
      .unwrap();
    assert_eq!(report.uploaded, 1);
  }

  #[tokio::test]
  async fn concurrency_is_bounded() {
    let fixture = fixture(12);
    let store = Arc::new(MemoryStore::default());

    sync_asset_groups(&fixture.groups, &fixture.assets_dir, store.clone(), &config(0))
      .await
      .unwrap();

    let max = store.max_in_flight.load(Ordering::SeqCst);
    assert!(max >= 1 && max <= 3, "max in flight was {max}");
  }

  #[tokio::test]
  async fn missing_materialized_file_is_counted() {
    let fixture = fixture(2);
    std::fs::remove_file(fixture.assets_dir.join(&fixture.groups[0].hash.0).join("css/1.css")).unwrap();
    let store = Arc::new(MemoryStore::default());

    let report = sync_asset_groups(&fixture.groups, &fixture.assets_dir, store, &config(0))
      .await
      .unwrap();
    assert_eq!(report.uploaded, 1);
    assert_eq!(report.missing, 1);
  }

  #[tokio::test]
  async fn syncs_into_local_store() {
    let fixture = fixture(2);
    let temp = TempDir::new().unwrap();
    let store = Arc::new(LocalObjectStore::new(temp.path()));

    let report = sync_asset_groups(&fixture.groups, &fixture.assets_dir, store.clone(), &config(0))
      .await
      .unwrap();
    assert_eq!(report.uploaded, 2);

    let report = sync_asset_groups(&fixture.groups, &fixture.assets_dir, store, &config(0))
      .await
      .unwrap();
    assert_eq!(report.unchanged, 2);
  }
}
