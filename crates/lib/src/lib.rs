//! stratus-lib: deploy planning for static-site generator output.
//!
//! Pipeline, leaves first:
//! - `headers`: glob cache rules to a final header set per route
//! - `assets`: static routes grouped by content type and cache-control
//! - `manifest`: the persisted build manifest
//! - `package`: functions repackaged as deployable directories
//! - `executor` / `routing` / `synth`: backends, CDN behaviors, declarations
//! - `sync`: asset groups mirrored into an object store

pub mod assets;
pub mod config;
pub mod consts;
pub mod executor;
pub mod headers;
pub mod manifest;
pub mod package;
pub mod route;
pub mod routing;
pub mod sync;
pub mod synth;
pub mod util;
