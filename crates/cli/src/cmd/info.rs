use anyhow::Result;

use stratus_lib::consts::APP_NAME;

use super::Context;
use crate::output::print_json;

pub fn cmd_info(ctx: &Context) -> Result<()> {
  let (config, path) = ctx.load_config()?;
  let path = path.map(|p| dunce::canonicalize(&p).unwrap_or(p).display().to_string());

  if ctx.format.is_json() {
    return print_json(&serde_json::json!({
      "name": APP_NAME,
      "version": env!("CARGO_PKG_VERSION"),
      "config": path,
      "assets_prefix": config.assets_prefix,
      "default_executor": config.default_executor,
    }));
  }

  println!("{} {}", APP_NAME, env!("CARGO_PKG_VERSION"));
  match path {
    Some(path) => println!("Config: {}", path),
    None => println!("Config: (defaults)"),
  }
  println!("Assets prefix: {}", config.assets_prefix);
  if ctx.verbose {
    println!("Cache rules: {}", config.cache_control.len());
    println!("Executor overrides: {}", config.executors.len());
  }
  Ok(())
}
