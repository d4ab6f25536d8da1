//! Implementation of the `stratus synth` command.

use std::path::Path;

use anyhow::{Context as _, Result};

use stratus_lib::consts::STACK_FILENAME;
use stratus_lib::synth::{StackDocument, SynthOptions, synthesize};

use super::{Context, load_manifest};
use crate::output::{print_info, print_json, print_stat, print_success};

pub fn cmd_synth(ctx: &Context, out_dir: &Path) -> Result<()> {
  let (config, _) = ctx.load_config()?;
  let manifest = load_manifest(out_dir)?;

  let options = SynthOptions {
    out_dir: out_dir.to_path_buf(),
    verify_packages: true,
  };
  let mut stack = StackDocument::new();
  let report = synthesize(&manifest, &config, &options, &mut stack).context("Failed to synthesize stack")?;

  let path = stack
    .save(&out_dir.join(STACK_FILENAME))
    .context("Failed to write stack document")?;

  if ctx.format.is_json() {
    return print_json(&serde_json::json!({
      "stack": path.display().to_string(),
      "resources": stack.resources.len(),
      "executors": report.executors,
      "disabled": report.disabled,
    }));
  }

  print_success(&format!("Synthesized {}", path.display()));
  print_stat("Resources", &stack.resources.len().to_string());
  print_stat("Behaviors", &report.plan.all_behaviors().count().to_string());
  for executor in &report.executors {
    print_stat(executor.function_id(), executor.name());
  }
  for function_id in &report.disabled {
    print_info(&format!("{function_id} is disabled and not routed"));
  }

  Ok(())
}
