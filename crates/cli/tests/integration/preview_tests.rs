//! Preview command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn preview_renders_a_generated_component() {
  let env = TestEnv::new();
  let file = env.fixture("counter.tsx");

  env
    .buildlab_cmd()
    .arg("preview")
    .arg(&file)
    .assert()
    .success()
    .stdout(predicate::str::contains("Count: 0"))
    .stdout(predicate::str::contains("<TouchableOpacity"))
    .stdout(predicate::str::contains("Let me know").not());
}

#[test]
fn presses_drive_component_state() {
  let env = TestEnv::new();
  let file = env.fixture("counter.tsx");

  env
    .buildlab_cmd()
    .arg("preview")
    .arg(&file)
    .args(["--press", "Increment", "--press", "Increment", "--press", "Reset"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Count: 2"))
    .stdout(predicate::str::contains("Reset?: Count is 2"));
}

#[test]
fn unknown_press_label_fails() {
  let env = TestEnv::new();
  let file = env.fixture("counter.tsx");

  env
    .buildlab_cmd()
    .arg("preview")
    .arg(&file)
    .args(["--press", "Launch"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("No pressable element labelled 'Launch'"));
}

#[test]
fn advancing_timers_re_renders() {
  let env = TestEnv::new();
  let file = env.fixture("ticker.tsx");

  env
    .buildlab_cmd()
    .arg("preview")
    .arg(&file)
    .args(["--advance", "2000"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Ticks: 2"));
}

#[test]
fn failing_timer_renders_an_error_panel() {
  let env = TestEnv::new();
  let file = env.fixture("ticker.tsx");

  env
    .buildlab_cmd()
    .args(["--verbose", "preview"])
    .arg(&file)
    .args(["--advance", "3000"])
    .assert()
    .failure()
    .stdout(predicate::str::contains("Ticks:").not())
    .stderr(predicate::str::contains("Ticker overheated"))
    .stderr(predicate::str::contains("timer advance failed"))
    .stderr(predicate::str::contains("Preview failed"));
}

#[test]
fn syntax_errors_render_an_error_panel() {
  let env = TestEnv::new();
  let file = env.fixture("syntax_error.tsx");

  env
    .buildlab_cmd()
    .arg("preview")
    .arg(&file)
    .assert()
    .failure()
    .stderr(predicate::str::contains("Syntax Error"));

  env
    .buildlab_cmd()
    .args(["--format", "json", "preview"])
    .arg(&file)
    .assert()
    .failure()
    .stdout(predicate::str::contains("\"kind\": \"transpile\""));
}

#[test]
fn disallowed_imports_are_reported() {
  let env = TestEnv::new();
  let file = env.fixture("disallowed_import.tsx");

  env
    .buildlab_cmd()
    .arg("preview")
    .arg(&file)
    .assert()
    .failure()
    .stderr(predicate::str::contains("Module Not Found"))
    .stderr(predicate::str::contains("Module not found: fs"));
}

#[test]
fn stored_builds_go_through_the_placeholders() {
  let env = TestEnv::new();
  let file = env.fixture("counter.tsx");
  let id = env.create_build("alice-token", "A counter");

  env
    .buildlab_cmd()
    .args(["preview", "--build", &id])
    .assert()
    .failure()
    .stderr(predicate::str::contains("No code available"));

  env.buildlab_cmd().args(["attach", &id]).arg(&file).assert().success();

  env
    .buildlab_cmd()
    .args(["preview", "--build", &id])
    .assert()
    .success()
    .stdout(predicate::str::contains("Count: 0"));

  env
    .buildlab_cmd()
    .args(["preview", "--build", "missing"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Build not found"));
}
