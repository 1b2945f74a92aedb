//! CLI output formatting utilities.
//!
//! Colored status messages, a few human-readable formatters, and the
//! rendering of preview trees, error panels and placeholders.

use std::time::Duration;

use anyhow::Context;
use buildlab_lib::render::node::outline;
use buildlab_lib::render::{ErrorPanel, Node, Placeholder};
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
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
}

/// Short form of a build id for listings.
pub fn short_id(id: &str) -> &str {
  match id.char_indices().nth(8) {
    Some((end, _)) => &id[..end],
    None => id,
  }
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
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

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
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

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

/// Render an error panel: title, message, then the stack when there is one.
pub fn print_panel(panel: &ErrorPanel) {
  print_error(&panel.title);
  eprintln!("  {}", panel.message);
  if let Some(stack) = &panel.stack {
    for line in stack.lines() {
      eprintln!("    {}", line.if_supports_color(Stream::Stderr, |s| s.dimmed()));
    }
  }
}

pub fn print_placeholder(placeholder: &Placeholder) {
  print_warning(placeholder.title());
  if let Some(message) = placeholder.message() {
    eprintln!("  {}", message);
  }
}

pub fn print_tree(tree: &[Node]) {
  if tree.is_empty() {
    print_info("Rendered nothing");
    return;
  }
  print!("{}", outline(tree));
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_short_id() {
    assert_eq!(short_id("0f8fad5b-d9cb-469f-a165-70867728950e"), "0f8fad5b");
    assert_eq!(short_id("b1"), "b1");
    assert_eq!(short_id(""), "");
  }

  #[test]
  fn test_format_duration() {
    assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
    assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
  }
}
