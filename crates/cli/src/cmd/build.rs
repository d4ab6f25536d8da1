//! Implementation of the `stratus build` command.
//!
//! Reads the generator's route and function snapshot, resolves headers,
//! classifies assets, writes the manifest and materializes asset groups under
//! the output directory.

use std::path::Path;

use anyhow::{Context as _, Result};
use serde::Serialize;

use stratus_lib::assets::{AssetWriteReport, write_asset_groups};
use stratus_lib::manifest::{ManifestBuilder, ManifestStore};
use stratus_lib::route::GeneratorOutput;

use super::Context;
use crate::output::{format_bytes, print_json, print_stat, print_success, print_warning};

#[derive(Serialize)]
struct BuildOutput<'a> {
  build_id: &'a str,
  manifest: String,
  routes: usize,
  functions: usize,
  assets: &'a AssetWriteReport,
}

pub fn cmd_build(ctx: &Context, input: &Path, out_dir: &Path, source: &Path) -> Result<()> {
  let (config, _) = ctx.load_config()?;
  let rules = config.compiled_rules().context("Invalid cache-control rules")?;

  let generated = GeneratorOutput::load(input).with_context(|| format!("Failed to read {}", input.display()))?;

  let manifest = ManifestBuilder::new(rules).build(generated.routes, generated.functions);
  manifest.validate().context("Generator output is inconsistent")?;

  let manifest_path = ManifestStore::new(out_dir)
    .save(&manifest)
    .context("Failed to write manifest")?;

  let report = write_asset_groups(&manifest.asset_groups, source, out_dir).context("Failed to write asset groups")?;

  if ctx.format.is_json() {
    return print_json(&BuildOutput {
      build_id: &manifest.build_id.0,
      manifest: manifest_path.display().to_string(),
      routes: manifest.routes.len(),
      functions: manifest.functions.len(),
      assets: &report,
    });
  }

  print_success(&format!("Build {}", manifest.build_id));
  print_stat("Routes", &manifest.routes.len().to_string());
  print_stat("Functions", &manifest.functions.len().to_string());
  print_stat("Asset groups", &report.groups.to_string());
  print_stat("Files", &format!("{} ({})", report.files_written, format_bytes(report.bytes_written)));
  print_stat("Manifest", &manifest_path.display().to_string());

  for missing in &report.missing {
    print_warning(&format!("Declared asset not found: {}", missing.display()));
  }

  Ok(())
}
