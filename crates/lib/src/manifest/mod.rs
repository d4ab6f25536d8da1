//! The build manifest.
//!
//! Produced once per build by [`ManifestBuilder`], persisted by
//! [`ManifestStore`], and read back by packaging and synthesis.

mod build_id;
mod builder;
mod store;
mod types;

pub use build_id::generate_build_id;
pub use builder::{ManifestBuilder, build_manifest};
pub use store::ManifestStore;
pub use types::*;
