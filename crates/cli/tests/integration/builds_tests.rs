//! Build store command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn create_requires_a_token() {
  let env = TestEnv::new();

  env
    .buildlab_cmd()
    .args(["create", "A todo list"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("You must be authenticated (400)"));

  env
    .buildlab_cmd()
    .args(["create", "A todo list", "--token", "forged"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("You are not authenticated (401)"));

  assert!(!env.store_path().exists());
}

#[test]
fn builds_are_listed_per_owner() {
  let env = TestEnv::new();
  env.create_build("alice-token", "A todo list with due dates");
  env.create_build("bob-token", "A weather card");

  env
    .buildlab_cmd()
    .args(["builds", "--owner", "alice"])
    .assert()
    .success()
    .stdout(predicate::str::contains("A todo list with due dates"))
    .stdout(predicate::str::contains("A weather card").not());

  env
    .buildlab_cmd()
    .args(["builds", "--owner", "carol"])
    .assert()
    .success()
    .stdout(predicate::str::contains("No builds for carol"));
}

#[test]
fn show_prints_build_metadata() {
  let env = TestEnv::new();
  let file = env.fixture("counter.tsx");
  let id = env.create_build("alice-token", "A counter");

  env
    .buildlab_cmd()
    .args(["attach", &id])
    .arg(&file)
    .args(["--app-id", "app-7"])
    .assert()
    .success();

  env
    .buildlab_cmd()
    .args(["show", &id])
    .assert()
    .success()
    .stdout(predicate::str::contains("A counter"))
    .stdout(predicate::str::contains("app-7"))
    .stdout(predicate::str::contains("yes"));

  env
    .buildlab_cmd()
    .args(["--format", "json", "show", &id])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"instantAppId\": \"app-7\""))
    .stdout(predicate::str::contains("\"isPreviewable\": true"));
}

#[test]
fn missing_builds_fail() {
  let env = TestEnv::new();

  env
    .buildlab_cmd()
    .args(["show", "nope"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Build not found: nope"));

  env
    .buildlab_cmd()
    .args(["attach", "nope"])
    .arg(env.fixture("counter.tsx"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("nope"));
}
