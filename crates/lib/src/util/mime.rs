//! Content-type lookup by file extension.

use std::path::Path;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Guess the content type of a file from its extension.
///
/// Extension matching is case-insensitive. Unknown or missing extensions fall
/// back to [`OCTET_STREAM`].
pub fn from_path(path: &Path) -> &'static str {
  let ext = path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase());
  from_extension(ext.as_deref())
}

pub fn from_extension(ext: Option<&str>) -> &'static str {
  match ext {
    Some("html" | "htm") => "text/html; charset=utf-8",
    Some("css") => "text/css; charset=utf-8",
    Some("js" | "mjs" | "cjs") => "application/javascript; charset=utf-8",
    Some("map") => "application/json",
    Some("json" | "webmanifest") => "application/json",
    Some("xml") => "application/xml",
    Some("txt") => "text/plain; charset=utf-8",
    Some("csv") => "text/csv; charset=utf-8",
    Some("md") => "text/markdown; charset=utf-8",

    Some("rss") => "application/rss+xml",
    Some("atom") => "application/atom+xml",

    Some("svg") => "image/svg+xml",
    Some("png") => "image/png",
    Some("jpg" | "jpeg") => "image/jpeg",
    Some("gif") => "image/gif",
    Some("webp") => "image/webp",
    Some("avif") => "image/avif",
    Some("ico") => "image/x-icon",
    Some("bmp") => "image/bmp",

    Some("mp3") => "audio/mpeg",
    Some("wav") => "audio/wav",
    Some("ogg" | "oga") => "audio/ogg",
    Some("mp4" | "m4v") => "video/mp4",
    Some("webm") => "video/webm",

    Some("woff") => "font/woff",
    Some("woff2") => "font/woff2",
    Some("ttf") => "font/ttf",
    Some("otf") => "font/otf",
    Some("eot") => "application/vnd.ms-fontobject",

    Some("pdf") => "application/pdf",
    Some("wasm") => "application/wasm",
    Some("zip") => "application/zip",
    Some("gz") => "application/gzip",

    _ => OCTET_STREAM,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn common_web_types() {
    assert_eq!(from_path(Path::new("public/app.js")), "application/javascript; charset=utf-8");
    assert_eq!(from_path(Path::new("public/styles.css")), "text/css; charset=utf-8");
    assert_eq!(from_path(Path::new("public/index.html")), "text/html; charset=utf-8");
    assert_eq!(from_path(Path::new("public/page-data/app-data.json")), "application/json");
  }

  #[test]
  fn extension_is_case_insensitive() {
    assert_eq!(from_path(Path::new("public/LOGO.PNG")), "image/png");
  }

  #[test]
  fn unknown_and_missing_extensions_fall_back() {
    assert_eq!(from_path(Path::new("public/data.bin")), OCTET_STREAM);
    assert_eq!(from_path(Path::new("public/CNAME")), OCTET_STREAM);
  }
}
