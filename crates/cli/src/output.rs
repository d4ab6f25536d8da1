//! Terminal output: status lines, labelled stats and `--format json`.
//!
//! Status lines go to stdout except errors and warnings, which go to stderr
//! so JSON on stdout stays parseable.

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream, Style};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    self == OutputFormat::Json
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
}

/// Size with a binary unit and one decimal, e.g. `1.5 KB`.
pub fn format_bytes(bytes: u64) -> String {
  const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

  if bytes < 1024 {
    return format!("{bytes} B");
  }
  let mut value = bytes as f64 / 1024.0;
  let mut unit = 0;
  while value >= 1024.0 && unit < UNITS.len() - 1 {
    value /= 1024.0;
    unit += 1;
  }
  format!("{value:.1} {}", UNITS[unit])
}

fn status_line(stream: Stream, symbol: &str, style: Style, message: &str, color_message: bool) -> String {
  let symbol = symbol.if_supports_color(stream, |s| s.style(style));
  if color_message {
    format!("{} {}", symbol, message.if_supports_color(stream, |s| s.style(style)))
  } else {
    format!("{symbol} {message}")
  }
}

pub fn print_success(message: &str) {
  println!(
    "{}",
    status_line(Stream::Stdout, symbols::SUCCESS, Style::new().green(), message, false)
  );
}

pub fn print_info(message: &str) {
  println!(
    "{}",
    status_line(Stream::Stdout, symbols::INFO, Style::new().blue(), message, false)
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{}",
    status_line(Stream::Stderr, symbols::WARNING, Style::new().yellow(), message, true)
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{}",
    status_line(Stream::Stderr, symbols::ERROR, Style::new().red(), message, true)
  );
}

/// Indented `label: value` line under a status line.
pub fn print_stat(label: &str, value: &str) {
  println!("  {}: {value}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()));
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
  println!("{json}");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bytes_use_binary_units() {
    assert_eq!(format_bytes(0), "0 B");
    assert_eq!(format_bytes(1023), "1023 B");
    assert_eq!(format_bytes(1536), "1.5 KB");
    assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
  }

  #[test]
  fn plain_status_line_without_color() {
    let line = status_line(Stream::Stdout, symbols::INFO, Style::new(), "skipped", false);
    assert!(line.ends_with("skipped"));
  }
}
