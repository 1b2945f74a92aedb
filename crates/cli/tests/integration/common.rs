//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Read fixture content.
pub fn fixture_content(name: &str) -> String {
  std::fs::read_to_string(fixture_path(name)).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

/// Isolated test environment.
///
/// Each test gets its own temporary directory holding the config file, the
/// build store and any component sources.
pub struct TestEnv {
  pub temp: TempDir,
  pub config_path: PathBuf,
}

impl TestEnv {
  /// Environment configured with the `buildlab.toml` fixture, which defines
  /// tokens for `alice` and `bob`.
  pub fn new() -> Self {
    let env = Self::empty();
    std::fs::write(&env.config_path, fixture_content("buildlab.toml")).unwrap();
    env
  }

  /// Environment without a config file; every setting is a default.
  pub fn empty() -> Self {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("buildlab.toml");
    Self { temp, config_path }
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  /// Copy a fixture into the temp directory.
  pub fn fixture(&self, name: &str) -> PathBuf {
    self.write_file(name, &fixture_content(name))
  }

  /// Build store file (isolated per test).
  pub fn store_path(&self) -> PathBuf {
    self.temp.path().join("data").join("builds.json")
  }

  /// Get a pre-configured Command for the buildlab binary.
  ///
  /// Sets environment variables for isolated testing:
  /// - `BUILDLAB_CONFIG`: The config file of this environment
  /// - `BUILDLAB_STORE`: Isolated build store
  /// - `XDG_CONFIG_HOME` / `XDG_DATA_HOME`: Isolated fallbacks
  pub fn buildlab_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("buildlab");
    cmd.env("BUILDLAB_CONFIG", &self.config_path);
    cmd.env("BUILDLAB_STORE", self.store_path());
    cmd.env("XDG_CONFIG_HOME", self.temp.path().join("config"));
    cmd.env("XDG_DATA_HOME", self.temp.path().join("data"));
    cmd.env_remove("BUILDLAB_TOKEN");
    cmd.env_remove("RUST_LOG");
    cmd
  }

  /// Create a build through the CLI and return its id.
  pub fn create_build(&self, token: &str, prompt: &str) -> String {
    let output = self
      .buildlab_cmd()
      .args(["--format", "json", "create", prompt, "--token", token])
      .output()
      .unwrap();
    assert!(output.status.success(), "create failed: {}", String::from_utf8_lossy(&output.stderr));
    let response: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    response["buildId"].as_str().unwrap().to_string()
  }
}
