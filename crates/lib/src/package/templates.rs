//! Files written into every packaged function.

/// Replaced with `./<entry point>` when the adapter is written.
pub const ENTRYPOINT_PLACEHOLDER: &str = "%STRATUS_ENTRYPOINT%";

/// Forces CommonJS resolution for the bundled output.
pub const PACKAGE_JSON: &str = "{\n  \"type\": \"commonjs\"\n}\n";

/// Invocation adapter.
///
/// Generator functions export either the handler itself or an object with the
/// handler under `default` next to a `config` field. Both shapes end up behind
/// `handle(req, res)`. When `PORT` is set (container targets) the adapter also
/// serves the handler over HTTP.
pub const HANDLER_TEMPLATE: &str = r#""use strict";

const entry = require("%STRATUS_ENTRYPOINT%");

const fn =
  typeof entry === "function"
    ? entry
    : entry && typeof entry.default === "function"
      ? entry.default
      : undefined;

if (fn === undefined) {
  throw new Error("function module exports neither a handler nor { default: handler }");
}

async function handle(req, res) {
  return fn(req, res);
}

exports.handle = handle;

if (process.env.PORT) {
  const http = require("http");
  http
    .createServer((req, res) => {
      Promise.resolve(handle(req, res)).catch((err) => {
        console.error(err);
        if (!res.headersSent) {
          res.statusCode = 500;
        }
        res.end();
      });
    })
    .listen(Number(process.env.PORT));
}
"#;

pub fn render_handler(entry: &str) -> String {
  HANDLER_TEMPLATE.replace(ENTRYPOINT_PLACEHOLDER, entry)
}

pub fn render_dockerfile(port: u16) -> String {
  format!(
    "FROM public.ecr.aws/docker/library/node:20-slim\n\
     WORKDIR /app\n\
     COPY . .\n\
     ENV NODE_ENV=production\n\
     ENV PORT={port}\n\
     EXPOSE {port}\n\
     CMD [\"node\", \"index.js\"]\n"
  )
}
