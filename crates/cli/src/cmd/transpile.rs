//! Transpile command implementation.
//!
//! Sanitizes and transpiles a component, printing the plain script or, with
//! `--format json`, the module with its static requires.

use anyhow::{Result, bail};
use buildlab_lib::sanitize::sanitize;
use buildlab_lib::transpile::transpile;

use super::read_source;
use crate::output::{OutputFormat, print_error, print_json};

pub fn cmd_transpile(file: &str, format: OutputFormat) -> Result<()> {
  let raw = read_source(file)?;

  let module = match transpile(sanitize(&raw)) {
    Ok(module) => module,
    Err(err) => {
      if format.is_json() {
        print_json(&serde_json::json!({
          "error": { "message": err.message, "line": err.line, "column": err.column }
        }))?;
      } else {
        print_error(&format!("{}: {}", file, err));
      }
      bail!("transpilation failed");
    }
  };

  if format.is_json() {
    print_json(&module)?;
  } else {
    print!("{}", module.code);
  }
  Ok(())
}
