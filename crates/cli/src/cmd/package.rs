//! Implementation of the `stratus package` command.

use std::path::Path;

use anyhow::{Context as _, Result};
use tracing::info;

use stratus_lib::executor::ExecutorSpec;
use stratus_lib::package::{EsbuildBundler, PackageJob, Packager};

use super::{Context, load_manifest};
use crate::output::{print_info, print_json, print_stat, print_success};

pub fn cmd_package(ctx: &Context, out_dir: &Path, source: &Path) -> Result<()> {
  let (config, _) = ctx.load_config()?;
  let manifest = load_manifest(out_dir)?;
  manifest.validate().context("Manifest is inconsistent")?;

  let mut jobs = Vec::new();
  let mut skipped = Vec::new();
  for function in &manifest.functions {
    let spec = config
      .executor_spec(function)
      .with_context(|| format!("Invalid executor options for {}", function.function_id))?;
    let container_port = match spec {
      ExecutorSpec::Disabled { function_id } => {
        info!(function = %function_id, "executor disabled, not packaging");
        skipped.push(function_id);
        continue;
      }
      ExecutorSpec::Lambda(_) => None,
      ExecutorSpec::Container(service) => Some(service.port),
    };
    jobs.push(PackageJob {
      function: function.clone(),
      container_port,
    });
  }

  let packager = Packager::new(
    EsbuildBundler::new(&config.bundler),
    source,
    out_dir,
    config.bundler.clone(),
  );

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let packaged = rt
    .block_on(packager.package_all(jobs))
    .context("Failed to package functions")?;

  if ctx.format.is_json() {
    return print_json(&serde_json::json!({
      "packaged": packaged,
      "disabled": skipped,
    }));
  }

  print_success(&format!("Packaged {} function(s)", packaged.len()));
  for function in &packaged {
    let kind = if function.container { "container" } else { "lambda" };
    print_stat(&function.function_id, &format!("{} ({} files)", kind, function.files_copied));
  }
  for function_id in &skipped {
    print_info(&format!("Skipped {function_id} (executor disabled)"));
  }

  Ok(())
}
