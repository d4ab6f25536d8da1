//! Implementation of the `stratus sync` command.
//!
//! Uploads the asset groups materialized by `stratus build` into an object
//! store directory, skipping unchanged objects and deleting stale ones.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use stratus_lib::consts::ASSETS_DIR;
use stratus_lib::sync::{LocalObjectStore, SyncError, SyncReport, sync_asset_groups};

use super::{Context, load_manifest};
use crate::output::{print_error, print_json, print_stat, print_success, print_warning};

pub fn cmd_sync(ctx: &Context, out_dir: &Path, store_root: &Path) -> Result<()> {
  let (config, _) = ctx.load_config()?;
  let manifest = load_manifest(out_dir)?;

  let store = Arc::new(LocalObjectStore::new(store_root));
  let assets_dir = out_dir.join(ASSETS_DIR);

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = rt.block_on(sync_asset_groups(&manifest.asset_groups, &assets_dir, store, &config.sync));

  let report = match result {
    Ok(report) => report,
    Err(SyncError::Partial { report }) => {
      print_summary(ctx, &report)?;
      for failure in &report.failures {
        print_error(&format!("{:?} {}: {}", failure.operation, failure.key, failure.message));
      }
      anyhow::bail!("{} object operation(s) failed", report.failures.len());
    }
    Err(err) => return Err(err).context("Failed to sync assets"),
  };

  print_summary(ctx, &report)
}

fn print_summary(ctx: &Context, report: &SyncReport) -> Result<()> {
  if ctx.format.is_json() {
    return print_json(report);
  }

  if report.failures.is_empty() {
    print_success("Assets synced");
  }
  print_stat("Uploaded", &report.uploaded.to_string());
  print_stat("Unchanged", &report.unchanged.to_string());
  print_stat("Deleted", &report.deleted.to_string());
  if report.missing > 0 {
    print_warning(&format!("{} asset(s) missing locally (run `stratus build`)", report.missing));
  }
  Ok(())
}
