//! Document command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn document_is_written_to_stdout() {
  let env = TestEnv::new();
  let file = env.fixture("counter.tsx");

  env
    .buildlab_cmd()
    .args(["document", "--app-id", "app-42"])
    .arg(&file)
    .assert()
    .success()
    .stdout(predicate::str::starts_with("<!DOCTYPE html>"))
    .stdout(predicate::str::contains("id=\"buildlab-config\""))
    .stdout(predicate::str::contains("\"appId\":\"app-42\""));
}

#[test]
fn document_is_written_to_a_file() {
  let env = TestEnv::new();
  let file = env.fixture("counter.tsx");
  let out = env.temp.path().join("preview.html");

  env
    .buildlab_cmd()
    .arg("document")
    .arg(&file)
    .arg("-o")
    .arg(&out)
    .assert()
    .success()
    .stdout(predicate::str::contains("Wrote"));

  let html = std::fs::read_to_string(&out).unwrap();
  assert!(html.contains("https://unpkg.com/react@18/umd/react.production.min.js"));
}

#[test]
fn syntax_errors_produce_an_errored_document() {
  let env = TestEnv::new();
  let file = env.fixture("syntax_error.tsx");

  env
    .buildlab_cmd()
    .arg("document")
    .arg(&file)
    .assert()
    .success()
    .stderr(predicate::str::contains("failed to compile"))
    .stdout(predicate::str::contains("\"dependencies\":[]"))
    .stdout(predicate::str::contains("Syntax Error"));
}

#[test]
fn preflight_fails_when_a_dependency_is_unreachable() {
  let env = TestEnv::empty();
  std::fs::write(
    &env.config_path,
    "[document]\nreadiness_timeout_ms = 2000\n\n[[document.dependencies]]\nname = \"react\"\nurl = \"http://127.0.0.1:9/react.js\"\n",
  )
  .unwrap();
  let file = env.fixture("counter.tsx");
  let out = env.temp.path().join("preview.html");

  env
    .buildlab_cmd()
    .arg("document")
    .arg(&file)
    .arg("--preflight")
    .arg("-o")
    .arg(&out)
    .assert()
    .failure()
    .stderr(predicate::str::contains("react"));

  assert!(!out.exists());
}
