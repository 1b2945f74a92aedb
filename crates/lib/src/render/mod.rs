//! Render adapters.
//!
//! An [`Environment`] is where a transpiled module ends up: the embedded
//! interpreter ([`native`]) or a standalone HTML document ([`document`]).
//! Both share the front half of the pipeline and differ only in the
//! dependency whitelist they expose and in how a module is mounted.

pub mod document;
pub mod native;
pub mod node;
pub mod readiness;
pub mod template;

use serde::Serialize;

use crate::error::{ErrorKind, PreviewError};
use crate::sandbox::Whitelist;
use crate::transpile::TranspiledModule;

pub use document::{Document, DocumentEnvironment};
pub use native::{HostView, MountedPreview, NativeEnvironment};
pub use node::Node;

/// Where and how a transpiled module is mounted.
pub trait Environment {
  /// Result of a successful mount.
  type Mounted;

  /// Short identifier used in logs.
  fn name(&self) -> &'static str;

  /// Modules the mounted code may import.
  fn whitelist(&self) -> Whitelist;

  fn mount(&self, module: TranspiledModule, scope: &MountScope) -> Result<Self::Mounted, PreviewError>;
}

/// Per-build values handed to the mounted code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountScope {
  /// Application id every database client is bound to.
  pub app_id: Option<String>,
  pub title: Option<String>,
}

impl MountScope {
  pub fn new(app_id: Option<String>, title: Option<String>) -> Self {
    Self { app_id, title }
  }
}

/// What is shown in place of a preview that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPanel {
  pub kind: ErrorKind,
  pub title: String,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub stack: Option<String>,
}

impl ErrorPanel {
  pub fn from_error(err: &PreviewError) -> Self {
    Self {
      kind: err.kind(),
      title: err.title().to_string(),
      message: err.to_string(),
      stack: err.stack().map(str::to_string),
    }
  }
}

impl From<&PreviewError> for ErrorPanel {
  fn from(err: &PreviewError) -> Self {
    Self::from_error(err)
  }
}

/// States of a preview surface that have nothing to render yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum Placeholder {
  Loading,
  LoadFailed(String),
  NotFound,
  NoCode,
}

impl Placeholder {
  pub fn title(&self) -> &'static str {
    match self {
      Placeholder::Loading => "Loading...",
      Placeholder::LoadFailed(_) => "Error loading build",
      Placeholder::NotFound => "Build not found",
      Placeholder::NoCode => "No code available",
    }
  }

  pub fn message(&self) -> Option<&str> {
    match self {
      Placeholder::Loading => None,
      Placeholder::LoadFailed(message) => Some(message),
      Placeholder::NotFound => Some("We couldn't find this build. Please check the ID or slug."),
      Placeholder::NoCode => Some("This build doesn't have any code to display."),
    }
  }
}
