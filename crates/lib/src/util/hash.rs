//! SHA-256 digests: short asset-group keys, object content hashes for sync,
//! and code hashes of packaged function directories.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::consts::OBJ_HASH_PREFIX_LEN;
use crate::util::fs::to_url_path;

/// Truncated lowercase hex SHA-256, e.g. `"a1b2c3d4e5f6789012ab"`.
///
/// Asset groups use it as their key, so it depends only on the hashed bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHash(pub String);

impl std::fmt::Display for ObjectHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Truncated SHA-256 of arbitrary bytes.
pub fn short_hash(data: &[u8]) -> ObjectHash {
  let full = hash_bytes(data).0;
  ObjectHash(full[..OBJ_HASH_PREFIX_LEN].to_string())
}

/// Full 64-character hex SHA-256.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Debug, thiserror::Error)]
pub enum DirHashError {
  #[error("failed to walk {root}: {source}")]
  Walk {
    root: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Digest of a packaged function directory.
///
/// Covers every regular file's `/`-separated relative path and contents in
/// sorted order. Directories, timestamps and permissions do not contribute,
/// so repackaging unchanged sources yields the same digest. Entries whose
/// name is in `exclude` are skipped along with everything below them.
pub fn hash_directory(root: &Path, exclude: &[&str]) -> Result<ContentHash, DirHashError> {
  let mut digest = Sha256::new();

  let entries = WalkDir::new(root)
    .min_depth(1)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|e| !e.file_name().to_str().is_some_and(|name| exclude.contains(&name)));

  for entry in entries {
    let entry = entry.map_err(|source| DirHashError::Walk {
      root: root.to_path_buf(),
      source,
    })?;
    if !entry.file_type().is_file() {
      continue;
    }

    let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
    let file_hash = hash_file(entry.path())?;
    digest.update(to_url_path(rel).as_bytes());
    digest.update([0]);
    digest.update(file_hash.0.as_bytes());
    digest.update([b'\n']);
  }

  Ok(ContentHash(hex::encode(digest.finalize())))
}

/// Full SHA-256 of one file, streamed.
pub fn hash_file(path: &Path) -> Result<ContentHash, DirHashError> {
  let read_err = |source| DirHashError::Read {
    path: path.to_path_buf(),
    source,
  };
  let mut file = fs::File::open(path).map_err(read_err)?;
  let mut digest = Sha256::new();
  io::copy(&mut file, &mut digest).map_err(read_err)?;
  Ok(ContentHash(hex::encode(digest.finalize())))
}

pub fn hash_bytes(data: &[u8]) -> ContentHash {
  ContentHash(hex::encode(Sha256::digest(data)))
}
