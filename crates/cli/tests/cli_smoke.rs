//! CLI smoke tests for buildlab.
//!
//! These tests verify that all CLI commands run without panicking and
//! return appropriate exit codes.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::TempDir;

/// Get a Command for the buildlab binary, isolated from the user's config
/// and build store.
fn buildlab_cmd(temp: &TempDir) -> Command {
  let mut cmd = cargo_bin_cmd!("buildlab");
  cmd.env("BUILDLAB_CONFIG", temp.path().join("buildlab.toml"));
  cmd.env("BUILDLAB_STORE", temp.path().join("builds.json"));
  cmd
}

/// Create a temp directory with a component source.
fn temp_component(content: &str) -> TempDir {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("App.tsx"), content).unwrap();
  temp
}

const GENERATED: &str = r#"Sure! Here's the component:

import React from 'react';
import { Text } from 'react-native';

const App = () => <Text>Hello</Text>;

export default App;

Enjoy!"#;

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  let temp = TempDir::new().unwrap();
  buildlab_cmd(&temp)
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  let temp = TempDir::new().unwrap();
  buildlab_cmd(&temp)
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("buildlab"));
}

#[test]
fn subcommand_help_works() {
  let temp = TempDir::new().unwrap();
  for cmd in &["sanitize", "transpile", "preview", "document", "create", "attach", "builds", "show"] {
    buildlab_cmd(&temp)
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

#[test]
fn preview_requires_a_source() {
  let temp = TempDir::new().unwrap();
  buildlab_cmd(&temp).arg("preview").assert().failure();
}

// =============================================================================
// sanitize
// =============================================================================

#[test]
fn sanitize_strips_surrounding_prose() {
  let temp = temp_component(GENERATED);

  buildlab_cmd(&temp)
    .arg("sanitize")
    .arg(temp.path().join("App.tsx"))
    .assert()
    .success()
    .stdout(predicate::str::starts_with("import React"))
    .stdout(predicate::str::contains("Sure!").not())
    .stdout(predicate::str::contains("Enjoy!").not());
}

#[test]
fn sanitize_reads_stdin() {
  let temp = TempDir::new().unwrap();

  buildlab_cmd(&temp)
    .arg("sanitize")
    .write_stdin(GENERATED)
    .assert()
    .success()
    .stdout(predicate::str::contains("export default App;"));
}

// =============================================================================
// transpile
// =============================================================================

#[test]
fn transpile_emits_plain_script() {
  let temp = temp_component(GENERATED);

  buildlab_cmd(&temp)
    .arg("transpile")
    .arg(temp.path().join("App.tsx"))
    .assert()
    .success()
    .stdout(predicate::str::contains("require(\"react-native\")"))
    .stdout(predicate::str::contains("<Text>").not());
}

#[test]
fn transpile_json_lists_requires() {
  let temp = temp_component(GENERATED);

  buildlab_cmd(&temp)
    .args(["--format", "json", "transpile"])
    .arg(temp.path().join("App.tsx"))
    .assert()
    .success()
    .stdout(predicate::str::contains("\"requires\""))
    .stdout(predicate::str::contains("\"hasDefaultExport\": true"));
}

#[test]
fn transpile_reports_syntax_errors_with_position() {
  let temp = temp_component("import React from 'react';\nfunction App() { return 1 +; }\nexport default App;\n");

  buildlab_cmd(&temp)
    .arg("transpile")
    .arg(temp.path().join("App.tsx"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("App.tsx: "))
    .stderr(predicate::str::contains("(2:"))
    .stderr(predicate::str::contains("transpilation failed"));
}

#[test]
fn transpile_nonexistent_file_fails() {
  let temp = TempDir::new().unwrap();

  buildlab_cmd(&temp)
    .arg("transpile")
    .arg("/nonexistent/path/App.tsx")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to read"));
}

// =============================================================================
// config
// =============================================================================

#[test]
#[serial]
fn invalid_config_is_reported() {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("buildlab.toml"), "[sandbox]\ntimeout_ms = 0\n").unwrap();

  buildlab_cmd(&temp)
    .args(["builds", "--owner", "alice"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
#[serial]
fn builds_with_empty_store_succeeds() {
  let temp = TempDir::new().unwrap();

  buildlab_cmd(&temp)
    .args(["builds", "--owner", "alice"])
    .assert()
    .success()
    .stdout(predicate::str::contains("No builds for alice"));
}
