//! Failures of the preview pipeline.
//!
//! Every stage returns its own variant; only the render adapters recover from
//! them, by showing an [`ErrorPanel`](crate::render::ErrorPanel) instead of a
//! preview.

use serde::Serialize;
use thiserror::Error;

use crate::transpile::TranspileError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreviewError {
  /// The source is not valid TSX.
  #[error(transparent)]
  Transpile(#[from] TranspileError),

  /// The generated code imports a module outside the dependency whitelist.
  #[error("Module not found: {0}")]
  ModuleNotFound(String),

  /// The generated code threw while its module body ran.
  #[error("{message}")]
  Evaluation { message: String, stack: Option<String> },

  /// The module ran but produced nothing callable.
  #[error("Code did not export a valid React component")]
  NoDefaultExport,

  /// Invoking the component or rendering its tree failed.
  #[error("{message}")]
  Mount { message: String, stack: Option<String> },
}

/// Stable identifier for each failure class, used in JSON output and panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  Transpile,
  ModuleNotFound,
  Evaluation,
  NoDefaultExport,
  Mount,
}

impl ErrorKind {
  pub fn as_str(self) -> &'static str {
    match self {
      ErrorKind::Transpile => "transpile",
      ErrorKind::ModuleNotFound => "module_not_found",
      ErrorKind::Evaluation => "evaluation",
      ErrorKind::NoDefaultExport => "no_default_export",
      ErrorKind::Mount => "mount",
    }
  }
}

impl PreviewError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      PreviewError::Transpile(_) => ErrorKind::Transpile,
      PreviewError::ModuleNotFound(_) => ErrorKind::ModuleNotFound,
      PreviewError::Evaluation { .. } => ErrorKind::Evaluation,
      PreviewError::NoDefaultExport => ErrorKind::NoDefaultExport,
      PreviewError::Mount { .. } => ErrorKind::Mount,
    }
  }

  /// JavaScript stack trace, when the failure came from running code.
  pub fn stack(&self) -> Option<&str> {
    match self {
      PreviewError::Evaluation { stack, .. } | PreviewError::Mount { stack, .. } => stack.as_deref(),
      _ => None,
    }
  }

  /// Short heading for an error panel.
  pub fn title(&self) -> &'static str {
    match self {
      PreviewError::Transpile(_) => "Syntax Error",
      PreviewError::ModuleNotFound(_) => "Module Not Found",
      PreviewError::Evaluation { .. } => "Runtime Error",
      PreviewError::NoDefaultExport => "No Component",
      PreviewError::Mount { .. } => "Render Error",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn transpile_errors_keep_their_position_in_the_message() {
    let err = PreviewError::from(TranspileError {
      message: "Unexpected token".to_string(),
      line: 3,
      column: 7,
    });
    assert_eq!(err.to_string(), "Unexpected token (3:7)");
    assert_eq!(err.kind(), ErrorKind::Transpile);
  }

  #[test]
  fn module_not_found_names_the_module() {
    let err = PreviewError::ModuleNotFound("fs".to_string());
    assert_eq!(err.to_string(), "Module not found: fs");
    assert_eq!(err.kind().as_str(), "module_not_found");
  }

  #[test]
  fn stack_is_only_reported_for_runtime_failures() {
    let err = PreviewError::Evaluation {
      message: "boom".to_string(),
      stack: Some("at <eval>".to_string()),
    };
    assert_eq!(err.stack(), Some("at <eval>"));
    assert_eq!(PreviewError::NoDefaultExport.stack(), None);
  }
}
