//! Materialize asset groups on disk as upload-ready directories.
//!
//! ```text
//! <out>/assets/
//! ├── <group-hash>/
//! │   ├── app-1a2b.js
//! │   └── framework-3c4d.js
//! └── <group-hash>/
//!     └── page-data/index/page-data.json
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use super::AssetGroup;
use crate::consts::ASSETS_DIR;
use crate::util::fs::copy_file;

#[derive(Debug, Error)]
pub enum AssetWriteError {
  #[error("failed to clear asset directory {path}: {source}")]
  Clear {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to copy {from} to {to}: {source}")]
  Copy {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: io::Error,
  },
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AssetWriteReport {
  pub groups: usize,
  pub files_written: usize,
  pub bytes_written: u64,
  /// Declared files that did not exist on disk.
  pub missing: Vec<PathBuf>,
}

/// Copy every group's files into `<out_dir>/assets/<hash>/<destination_key>`.
///
/// The asset directory is rebuilt from scratch. Files the generator declared
/// but did not write are skipped with a warning and listed in the report.
pub fn write_asset_groups(
  groups: &[AssetGroup],
  source_root: &Path,
  out_dir: &Path,
) -> Result<AssetWriteReport, AssetWriteError> {
  let assets_dir = out_dir.join(ASSETS_DIR);
  match fs::remove_dir_all(&assets_dir) {
    Ok(()) => {}
    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
    Err(source) => {
      return Err(AssetWriteError::Clear {
        path: assets_dir,
        source,
      });
    }
  }

  let mut report = AssetWriteReport {
    groups: groups.len(),
    ..Default::default()
  };

  for group in groups {
    let group_dir = assets_dir.join(&group.hash.0);
    for asset in &group.assets {
      let from = source_root.join(&asset.source_file_path);
      let to = group_dir.join(&asset.destination_key);

      if !from.is_file() {
        warn!(file = %from.display(), group = %group.hash, "declared asset missing, skipping");
        report.missing.push(asset.source_file_path.clone());
        continue;
      }

      let bytes = copy_file(&from, &to).map_err(|source| AssetWriteError::Copy {
        from: from.clone(),
        to: to.clone(),
        source,
      })?;
      report.files_written += 1;
      report.bytes_written += bytes;
    }
  }

  info!(
    groups = report.groups,
    files = report.files_written,
    missing = report.missing.len(),
    "wrote asset groups"
  );
  Ok(report)
}
