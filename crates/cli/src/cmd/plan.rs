//! Implementation of the `stratus plan` command.
//!
//! Runs synthesis against an in-memory stack without requiring packaged
//! functions and prints the resulting CDN behaviors.

use std::path::Path;

use anyhow::{Context as _, Result};

use stratus_lib::routing::{CacheBehavior, Origin};
use stratus_lib::synth::{StackDocument, SynthOptions, synthesize};

use super::{Context, load_manifest};
use crate::output::{print_info, print_json, print_stat, symbols};

pub fn cmd_plan(ctx: &Context, out_dir: &Path) -> Result<()> {
  let (config, _) = ctx.load_config()?;
  let manifest = load_manifest(out_dir)?;

  let options = SynthOptions {
    out_dir: out_dir.to_path_buf(),
    verify_packages: false,
  };
  let mut stack = StackDocument::new();
  let report = synthesize(&manifest, &config, &options, &mut stack).context("Failed to plan distribution")?;

  if ctx.format.is_json() {
    return print_json(&report);
  }

  println!("Build: {}", manifest.build_id);
  print_stat("Asset groups", &manifest.asset_groups.len().to_string());
  print_stat("Executors", &report.executors.len().to_string());
  print_stat("Resources", &stack.resources.len().to_string());
  println!();

  println!("Behaviors:");
  for behavior in report.plan.all_behaviors() {
    print_behavior(behavior);
  }

  for function_id in &report.disabled {
    print_info(&format!("{function_id} is disabled and not routed"));
  }

  Ok(())
}

fn print_behavior(behavior: &CacheBehavior) {
  let pattern = behavior.path_pattern.as_deref().unwrap_or("(default)");
  println!(
    "  {} {} {} [{}]",
    pattern,
    symbols::ARROW,
    describe_origin(&behavior.origin),
    behavior.class
  );
  for header in &behavior.response_header_overrides {
    println!("      {}: {}", header.key, header.value);
  }
}

fn describe_origin(origin: &Origin) -> String {
  match origin {
    Origin::Bucket { bucket, .. } => format!("bucket {bucket}"),
    Origin::FunctionUrl { function_id, .. } => format!("function url {function_id}"),
    Origin::LoadBalancer { function_id, .. } => format!("load balancer {function_id}"),
  }
}
