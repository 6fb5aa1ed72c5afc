//! CLI output formatting utilities.
//!
//! Colored status lines, stat rows and action lines shared by every command.
//! With `--output json` commands print a single JSON summary on stdout
//! instead.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
  pub const COPY: &str = "+";
  pub const WRITE: &str = "~";
  pub const EXEC: &str = "$";
  pub const SKIPPED: &str = "-";
}

/// Symbol for an action kind as reported by `ActionCommand::kind`.
pub fn action_symbol(kind: &str) -> &'static str {
  match kind {
    "copy" => symbols::COPY,
    "write" => symbols::WRITE,
    _ => symbols::EXEC,
  }
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    format!("{}m {}s", secs / 60, secs % 60)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

/// One declared action: `  + label (copy)`.
pub fn print_action(kind: &str, label: &str) {
  println!(
    "  {} {} {}",
    action_symbol(kind).if_supports_color(Stream::Stdout, |s| s.green()),
    label,
    format!("({})", kind).if_supports_color(Stream::Stdout, |s| s.dimmed())
  );
}

/// Indented detail under an action line.
pub fn print_detail(text: &str) {
  println!("      {} {}", symbols::ARROW, text);
}

pub fn print_failed_action(label: &str, error: &str) {
  eprintln!(
    "  {} {}: {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    label,
    error
  );
}

pub fn print_skipped_action(label: &str, failed_dependency: &str) {
  eprintln!(
    "  {} {} {}",
    symbols::SKIPPED.if_supports_color(Stream::Stderr, |s| s.yellow()),
    label,
    format!("(after {})", failed_dependency).if_supports_color(Stream::Stderr, |s| s.dimmed())
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
