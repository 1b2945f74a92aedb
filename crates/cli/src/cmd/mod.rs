mod attach;
mod builds;
mod create;
mod document;
mod preview;
mod sanitize;
mod show;
mod transpile;

pub use attach::cmd_attach;
pub use builds::cmd_builds;
pub use create::cmd_create;
pub use document::cmd_document;
pub use preview::cmd_preview;
pub use sanitize::cmd_sanitize;
pub use show::cmd_show;
pub use transpile::cmd_transpile;

use std::io::Read;

use anyhow::{Context, Result};
use buildlab_lib::render::MountScope;

/// Where `preview` and `document` get their component from.
pub enum PreviewSource {
  File { path: String, app_id: Option<String> },
  Build(String),
}

impl PreviewSource {
  /// Clap guarantees exactly one of `file` and `build`.
  pub fn new(file: Option<String>, build: Option<String>, app_id: Option<String>) -> Self {
    match (build, file) {
      (Some(id), _) => PreviewSource::Build(id),
      (None, path) => PreviewSource::File {
        path: path.unwrap_or_else(|| "-".to_string()),
        app_id,
      },
    }
  }
}

/// Scope for a component read from a file, titled after the file.
fn file_scope(path: &str, app_id: Option<String>) -> MountScope {
  MountScope::new(app_id, Some(path.to_string()))
}

/// Read `path`, or stdin when it is "-".
fn read_source(path: &str) -> Result<String> {
  if path == "-" {
    let mut content = String::new();
    std::io::stdin()
      .read_to_string(&mut content)
      .context("Failed to read stdin")?;
    return Ok(content);
  }
  std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))
}
