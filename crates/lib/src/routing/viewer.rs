//! Viewer-request function source generation.

use std::fmt::Write;

use super::ViewerRewrite;

/// Render the viewer-request function that applies `rewrites` in order.
///
/// The output targets the CDN's restricted JavaScript runtime: a single
/// `handler(event)` returning the (possibly rewritten) request.
pub fn render_viewer_function(rewrites: &[ViewerRewrite]) -> String {
  let mut body = String::new();

  for rewrite in rewrites {
    match rewrite {
      ViewerRewrite::StripPrefix { prefix } => {
        let prefix = prefix.trim_end_matches('/');
        let exact = js_string(prefix);
        let with_slash = js_string(&format!("{prefix}/"));
        let _ = write!(
          body,
          "  if (uri === {exact}) {{\n    uri = \"/\";\n  }} else if (uri.startsWith({with_slash})) {{\n    uri = uri.substring({len});\n  }}\n",
          len = prefix.encode_utf16().count()
        );
      }
      ViewerRewrite::DirectoryIndex => {
        body.push_str(
          "  if (uri.endsWith(\"/\")) {\n    uri += \"index.html\";\n  } else if (!uri.substring(uri.lastIndexOf(\"/\") + 1).includes(\".\")) {\n    uri += \"/index.html\";\n  }\n",
        );
      }
    }
  }

  format!("function handler(event) {{\n  var request = event.request;\n  var uri = request.uri;\n{body}  request.uri = uri;\n  return request;\n}}\n")
}

fn js_string(value: &str) -> String {
  serde_json::Value::String(value.to_string()).to_string()
}
