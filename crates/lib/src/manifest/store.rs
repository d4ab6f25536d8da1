//! Manifest persistence.
//!
//! The manifest lives at `<out>/manifest.json`. Writes are atomic so a
//! concurrently running synthesis never reads a half-written file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{MANIFEST_VERSION, Manifest, ManifestError};
use crate::consts::MANIFEST_FILENAME;
use crate::util::fs::write_atomic;

#[derive(Debug, Clone)]
pub struct ManifestStore {
  out_dir: PathBuf,
}

impl ManifestStore {
  pub fn new(out_dir: impl Into<PathBuf>) -> Self {
    Self { out_dir: out_dir.into() }
  }

  pub fn out_dir(&self) -> &Path {
    &self.out_dir
  }

  pub fn path(&self) -> PathBuf {
    self.out_dir.join(MANIFEST_FILENAME)
  }

  pub fn save(&self, manifest: &Manifest) -> Result<PathBuf, ManifestError> {
    let path = self.path();
    let content = serde_json::to_string_pretty(manifest).map_err(ManifestError::Serialize)?;
    write_atomic(&path, content.as_bytes()).map_err(|source| ManifestError::Write {
      path: path.clone(),
      source,
    })?;
    debug!(path = %path.display(), build_id = %manifest.build_id, "saved manifest");
    Ok(path)
  }

  pub fn load(&self) -> Result<Manifest, ManifestError> {
    let path = self.path();
    let content = fs::read_to_string(&path).map_err(|source| ManifestError::Read {
      path: path.clone(),
      source,
    })?;

    // Check the version before the full parse so an incompatible layout gets a
    // version error rather than a field error.
    let probe: serde_json::Value = serde_json::from_str(&content).map_err(ManifestError::Parse)?;
    let version = probe.get("version").and_then(|v| v.as_u64()).unwrap_or(0);
    match u32::try_from(version) {
      Ok(MANIFEST_VERSION) => {}
      Ok(other) => return Err(ManifestError::UnsupportedVersion(other)),
      Err(_) => return Err(ManifestError::UnsupportedVersion(u32::MAX)),
    }

    serde_json::from_value(probe).map_err(ManifestError::Parse)
  }
}
