mod cmd;
mod output;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stratus_lib::consts::DEFAULT_OUT_DIR;

use crate::output::{OutputFormat, print_error};

/// stratus - deploy planner for static-site generator output
#[derive(Parser)]
#[command(name = "stratus")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  format: OutputFormat,

  /// Configuration file (default: $STRATUS_CONFIG, then ./stratus.toml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Args, Clone)]
pub struct OutArgs {
  /// Build output directory
  #[arg(short, long, default_value = DEFAULT_OUT_DIR)]
  out: PathBuf,
}

#[derive(Args, Clone)]
pub struct SourceArgs {
  /// Site root the generator ran in
  #[arg(short, long, default_value = ".")]
  source: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
  /// Build the manifest from generator output and materialize asset groups
  Build {
    /// Generator output file (routes and functions)
    #[arg(short, long)]
    input: PathBuf,

    #[command(flatten)]
    out: OutArgs,

    #[command(flatten)]
    source: SourceArgs,
  },

  /// Package every function in the manifest
  Package {
    #[command(flatten)]
    out: OutArgs,

    #[command(flatten)]
    source: SourceArgs,
  },

  /// Show the CDN routing plan
  Plan {
    #[command(flatten)]
    out: OutArgs,
  },

  /// Synthesize the stack document
  Synth {
    #[command(flatten)]
    out: OutArgs,
  },

  /// Sync asset groups into an object store directory
  Sync {
    #[command(flatten)]
    out: OutArgs,

    /// Object store root directory
    #[arg(long)]
    store: PathBuf,
  },

  /// Show version and configuration
  Info,
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "info" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let ctx = cmd::Context {
    config: cli.config,
    format: cli.format,
    verbose: cli.verbose,
  };

  let result = match cli.command {
    Commands::Build { input, out, source } => cmd::cmd_build(&ctx, &input, &out.out, &source.source),
    Commands::Package { out, source } => cmd::cmd_package(&ctx, &out.out, &source.source),
    Commands::Plan { out } => cmd::cmd_plan(&ctx, &out.out),
    Commands::Synth { out } => cmd::cmd_synth(&ctx, &out.out),
    Commands::Sync { out, store } => cmd::cmd_sync(&ctx, &out.out, &store),
    Commands::Info => cmd::cmd_info(&ctx),
  };

  if let Err(err) = result {
    print_error(&format!("{err:#}"));
    std::process::exit(1);
  }
}
