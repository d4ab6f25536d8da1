//! Test helpers for building and inspecting directory trees.

use std::path::Path;

use walkdir::WalkDir;

use super::fs::to_url_path;

/// Write `content` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) {
  let path = root.join(rel);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(path, content).unwrap();
}

/// Every file below `dir` as a sorted list of rooted URL paths.
pub fn files_in(dir: &Path) -> Vec<String> {
  let mut files: Vec<String> = WalkDir::new(dir)
    .min_depth(1)
    .into_iter()
    .filter_map(Result::ok)
    .filter(|e| e.file_type().is_file())
    .map(|e| to_url_path(e.path().strip_prefix(dir).unwrap()))
    .collect();
  files.sort();
  files
}
