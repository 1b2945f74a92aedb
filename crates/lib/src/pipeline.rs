//! The shared preview pipeline: sanitize, transpile, then mount into an
//! [`Environment`].

use tracing::{debug, warn};

use crate::error::PreviewError;
use crate::render::{Environment, ErrorPanel, MountScope};
use crate::sanitize::sanitize;
use crate::transpile::{self, TranspiledModule};

/// Outcome of a render. Failures never escape past this point.
#[derive(Debug)]
pub enum Rendered<M> {
  Mounted(M),
  Error(ErrorPanel),
}

impl<M> Rendered<M> {
  pub fn is_mounted(&self) -> bool {
    matches!(self, Rendered::Mounted(_))
  }

  pub fn mounted(self) -> Option<M> {
    match self {
      Rendered::Mounted(mounted) => Some(mounted),
      Rendered::Error(_) => None,
    }
  }

  pub fn error(&self) -> Option<&ErrorPanel> {
    match self {
      Rendered::Mounted(_) => None,
      Rendered::Error(panel) => Some(panel),
    }
  }
}

/// Runs generated code through one environment. Nothing is cached between
/// runs; every call starts from the raw code string.
#[derive(Debug, Clone)]
pub struct Pipeline<E> {
  environment: E,
}

impl<E: Environment> Pipeline<E> {
  pub fn new(environment: E) -> Self {
    Self { environment }
  }

  pub fn environment(&self) -> &E {
    &self.environment
  }

  /// Sanitize and transpile.
  pub fn compile(&self, code: &str) -> Result<TranspiledModule, PreviewError> {
    let body = sanitize(code);
    debug!(raw = code.len(), sanitized = body.len(), "sanitized generated code");
    Ok(transpile::transpile(body)?)
  }

  /// Compile and mount, propagating the first failure.
  pub fn run(&self, code: &str, scope: &MountScope) -> Result<E::Mounted, PreviewError> {
    let module = self.compile(code)?;
    self.environment.mount(module, scope)
  }

  /// Compile and mount, turning any failure into an [`ErrorPanel`].
  pub fn render(&self, code: &str, scope: &MountScope) -> Rendered<E::Mounted> {
    let environment = self.environment.name();
    match self.run(code, scope) {
      Ok(mounted) => {
        debug!(environment, "preview mounted");
        Rendered::Mounted(mounted)
      }
      Err(err) => {
        warn!(environment, kind = err.kind().as_str(), error = %err, "preview failed");
        Rendered::Error(ErrorPanel::from_error(&err))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ErrorKind;
  use crate::render::{DocumentEnvironment, NativeEnvironment, document::DocumentConfig};

  fn native() -> Pipeline<NativeEnvironment> {
    Pipeline::new(NativeEnvironment::default())
  }

  const COUNTER: &str = r#"Here is your app:

import React, { useState } from 'react';
import { View, Text, TouchableOpacity, StyleSheet } from 'react-native';

interface Props {
  start?: number;
}

function App() {
  const [count, setCount] = useState<number>(0);
  return (
    <View style={styles.container}>
      <Text>Count: {count}</Text>
      <TouchableOpacity onPress={() => setCount((c) => c + 1)}>
        <Text>Increment</Text>
      </TouchableOpacity>
    </View>
  );
}

const styles = StyleSheet.create({
  container: { flex: 1, alignItems: 'center' },
});

export default App;

Let me know if you want changes!"#;

  #[test]
  fn well_formed_module_mounts() {
    let rendered = native().render(COUNTER, &MountScope::default());
    let preview = rendered.mounted().unwrap();
    assert!(preview.text().contains("Count: 0"));
  }

  #[test]
  fn leading_comment_and_trailing_garbage_are_ignored() {
    let code = "// comment\nimport React from 'react';\nfunction App(){ return null; }\nexport default App;\nTRAILING GARBAGE";
    let pipeline = native();

    let module = pipeline.compile(code).unwrap();
    assert!(!module.code.contains("comment"));
    assert!(!module.code.contains("TRAILING"));

    let rendered = pipeline.render(code, &MountScope::default());
    assert!(rendered.is_mounted());
    assert!(rendered.mounted().unwrap().tree().is_empty());
  }

  #[test]
  fn disallowed_import_renders_an_error_panel() {
    let code = "import fs from 'fs';\nfunction App() { return null; }\nexport default App;";
    let rendered = native().render(code, &MountScope::default());
    let panel = rendered.error().unwrap();
    assert_eq!(panel.kind, ErrorKind::ModuleNotFound);
    assert!(panel.message.contains("Module not found: fs"));
  }

  #[test]
  fn syntax_errors_stop_before_loading() {
    let code = "import React from 'react';\nfunction App() { return 1 +; }\nexport default App;";
    match native().run(code, &MountScope::default()).unwrap_err() {
      PreviewError::Transpile(err) => assert_eq!(err.line, 2),
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[test]
  fn every_failure_class_is_caught() {
    let cases = [
      ("function App( {", ErrorKind::Transpile),
      ("import x from 'lodash';\nexport default () => null;", ErrorKind::ModuleNotFound),
      ("null.boom;\nexport default () => null;", ErrorKind::Evaluation),
      ("export const value = 1;", ErrorKind::NoDefaultExport),
      ("export default function App() { return undefinedThing; }", ErrorKind::Mount),
    ];
    for (code, kind) in cases {
      let rendered = native().render(code, &MountScope::default());
      assert_eq!(rendered.error().map(|panel| panel.kind), Some(kind), "{code}");
    }
  }

  #[test]
  fn repeated_runs_are_independent() {
    let pipeline = native();
    let mut first = pipeline.run(COUNTER, &MountScope::default()).unwrap();
    let press = first.find_handler("onPress", Some("Increment")).unwrap();
    first.dispatch(&press, &[]).unwrap();
    assert!(first.text().contains("Count: 1"));

    let second = pipeline.run(COUNTER, &MountScope::default()).unwrap();
    let fresh = pipeline.run(COUNTER, &MountScope::default()).unwrap();
    assert_eq!(second.tree(), fresh.tree());
    assert!(second.text().contains("Count: 0"));
  }

  #[test]
  fn document_environment_shares_the_front_half() {
    let pipeline = Pipeline::new(DocumentEnvironment::new(DocumentConfig::default()).unwrap());
    assert_eq!(pipeline.environment().name(), "document");
    assert!(pipeline.render(COUNTER, &MountScope::default()).is_mounted());

    let rendered = pipeline.render("function App( {", &MountScope::default());
    assert_eq!(rendered.error().map(|panel| panel.kind), Some(ErrorKind::Transpile));
  }
}
