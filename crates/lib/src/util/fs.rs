//! Filesystem helpers shared by manifest persistence, packaging and sync.

use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path};

use tempfile::NamedTempFile;
use walkdir::WalkDir;

/// Write `content` to `path` atomically (write to a temp file in the same
/// directory, then rename over the target).
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
  let parent = match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  };
  fs::create_dir_all(parent)?;

  let mut temp = NamedTempFile::new_in(parent)?;
  temp.write_all(content)?;
  temp.as_file().sync_all()?;
  temp.persist(path).map_err(|e| e.error)?;
  Ok(())
}

/// Copy a file, creating the destination's parent directories.
pub fn copy_file(src: &Path, dst: &Path) -> io::Result<u64> {
  if let Some(parent) = dst.parent() {
    fs::create_dir_all(parent)?;
  }
  fs::copy(src, dst)
}

/// Remove every empty directory below `root` (the root itself is kept).
///
/// Walks contents-first so a directory is visited after its children, which
/// lets nested empty chains collapse in a single pass.
pub fn prune_empty_dirs(root: &Path) -> io::Result<usize> {
  let mut removed = 0;
  for entry in WalkDir::new(root).min_depth(1).contents_first(true) {
    let entry = entry.map_err(io::Error::other)?;
    if !entry.file_type().is_dir() {
      continue;
    }
    if fs::read_dir(entry.path())?.next().is_none() {
      fs::remove_dir(entry.path())?;
      removed += 1;
    }
  }
  Ok(removed)
}

/// Render a relative filesystem path as a rooted, `/`-separated URL path.
pub fn to_url_path(rel: &Path) -> String {
  let mut out = String::new();
  for component in rel.components() {
    if let Component::Normal(part) = component {
      out.push('/');
      out.push_str(&part.to_string_lossy());
    }
  }
  if out.is_empty() {
    out.push('/');
  }
  out
}

/// Resolve a path declared by the generator against `root`.
///
/// Absolute paths inside `root` are made relative to it; relative paths are
/// returned unchanged. Returns `None` for absolute paths outside `root` or
/// paths that climb out of it with `..`.
pub fn relative_to_root(path: &Path, root: &Path) -> Option<std::path::PathBuf> {
  let rel = if path.is_absolute() {
    path.strip_prefix(root).ok()?.to_path_buf()
  } else {
    path.to_path_buf()
  };
  if rel.components().any(|c| matches!(c, Component::ParentDir)) {
    return None;
  }
  Some(rel)
}

/// True when `name` is exactly one normal path component, so joining it onto
/// a directory stays directly inside that directory.
pub fn is_single_component(name: &str) -> bool {
  let mut components = Path::new(name).components();
  matches!(
    (components.next(), components.next()),
    (Some(Component::Normal(part)), None) if part == name
  )
}
