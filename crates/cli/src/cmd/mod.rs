mod build;
mod info;
mod package;
mod plan;
mod sync;
mod synth;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use tracing::debug;

use stratus_lib::config::Config;
use stratus_lib::manifest::{Manifest, ManifestStore};

use crate::output::OutputFormat;

pub use build::cmd_build;
pub use info::cmd_info;
pub use package::cmd_package;
pub use plan::cmd_plan;
pub use sync::cmd_sync;
pub use synth::cmd_synth;

/// Global options shared by every command.
pub struct Context {
  pub config: Option<PathBuf>,
  pub format: OutputFormat,
  pub verbose: bool,
}

impl Context {
  pub fn load_config(&self) -> Result<(Config, Option<PathBuf>)> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let (config, path) = Config::discover(self.config.as_deref(), &cwd).context("Failed to load configuration")?;
    match &path {
      Some(path) => debug!(path = %path.display(), "loaded configuration"),
      None => debug!("no configuration file found, using defaults"),
    }
    Ok((config, path))
  }
}

/// Load the manifest a previous `stratus build` wrote to `out_dir`.
pub fn load_manifest(out_dir: &Path) -> Result<Manifest> {
  ManifestStore::new(out_dir)
    .load()
    .with_context(|| format!("Failed to load manifest from {} (run `stratus build` first)", out_dir.display()))
}
