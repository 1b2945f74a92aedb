//! TSX to plain JavaScript compilation.
//!
//! Generated components are written in TypeScript with JSX. This module turns
//! them into a CommonJS-style script that both QuickJS and browsers can
//! evaluate: types are erased while parsing, JSX becomes
//! `React.createElement` calls and module syntax becomes `require`/`exports`.
//!
//! The pipeline is `parser` → `module` (import/export lowering) → `codegen`.

mod ast;
mod codegen;
mod jsx;
mod lexer;
mod module;
mod parser;
mod types;

use serde::Serialize;
use tracing::debug;

/// A syntax error, or a TypeScript construct the compiler does not lower.
///
/// Displays as `message (line:column)`, with a 1-based line and a 0-based
/// column counted in characters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} ({line}:{column})")]
pub struct TranspileError {
  pub message: String,
  pub line: usize,
  pub column: usize,
}

impl TranspileError {
  pub(crate) fn at(src: &str, pos: usize, message: impl Into<String>) -> Self {
    let before = src.get(..pos).unwrap_or(src);
    let mut line = 1;
    let mut column = 0;
    for c in before.chars() {
      if lexer::is_line_terminator(c) {
        line += 1;
        column = 0;
      } else {
        column += 1;
      }
    }
    Self {
      message: message.into(),
      line,
      column,
    }
  }
}

/// Output of [`transpile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranspiledModule {
  /// Executable script text. Expects `require` and `exports` in scope.
  pub code: String,
  /// Modules named by static imports and re-exports, in source order,
  /// without duplicates.
  pub requires: Vec<String>,
  /// Whether the module assigns `exports.default`.
  pub has_default_export: bool,
}

/// Compile a TSX module.
pub fn transpile(source: &str) -> Result<TranspiledModule, TranspileError> {
  let parsed = parser::parse_module(source)?;
  let lowered = module::lower(parsed);
  let code = codegen::print(&lowered.body);
  debug!(
    bytes = code.len(),
    requires = ?lowered.requires,
    default_export = lowered.has_default_export,
    "transpiled module"
  );
  Ok(TranspiledModule {
    code,
    requires: lowered.requires,
    has_default_export: lowered.has_default_export,
  })
}
