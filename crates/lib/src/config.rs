//! `buildlab.toml`.
//!
//! Every field has a default, so a missing file is a valid configuration.
//!
//! ```toml
//! [sandbox]
//! memory_limit = 67108864
//! timeout_ms = 2000
//!
//! [document]
//! readiness_timeout_ms = 15000
//!
//! [[document.dependencies]]
//! name = "react"
//! url = "https://unpkg.com/react@18/umd/react.production.min.js"
//!
//! [[auth.tokens]]
//! token = "dev-token"
//! user = "dev"
//!
//! [store]
//! path = "/var/lib/buildlab/builds.json"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::auth::AuthConfig;
use crate::platform::paths::{config_file, store_file};
use crate::render::document::DocumentConfig;
use crate::sandbox::{MAX_STACK_SIZE, MIN_STACK_SIZE, SandboxLimits};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("invalid config {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("invalid config: {0}")]
  Invalid(String),
}

/// `[store]` settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
  /// Build store file. Defaults to `$BUILDLAB_STORE` or the data directory.
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  pub sandbox: SandboxLimits,
  pub document: DocumentConfig,
  pub auth: AuthConfig,
  pub store: StoreConfig,
}

impl Config {
  /// Load from `$BUILDLAB_CONFIG` or the platform config directory.
  pub fn load() -> Result<Self, ConfigError> {
    Self::load_from(&config_file())
  }

  /// Load from `path`. A missing file yields the defaults.
  pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
    let content = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Self::default());
      }
      Err(source) => {
        return Err(ConfigError::Read {
          path: path.to_path_buf(),
          source,
        });
      }
    };
    let config = Self::parse(&content).map_err(|err| match err {
      ConfigError::Parse { source, .. } => ConfigError::Parse {
        path: path.to_path_buf(),
        source,
      },
      other => other,
    })?;
    debug!(path = %path.display(), "loaded config");
    Ok(config)
  }

  pub fn parse(content: &str) -> Result<Self, ConfigError> {
    let config: Config = toml::from_str(content).map_err(|source| ConfigError::Parse {
      path: PathBuf::new(),
      source,
    })?;
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<(), ConfigError> {
    if self.sandbox.timeout_ms == 0 {
      return Err(ConfigError::Invalid("sandbox.timeout_ms must be positive".to_string()));
    }
    let stack = self.sandbox.max_stack_size;
    if !(MIN_STACK_SIZE..=MAX_STACK_SIZE).contains(&stack) {
      return Err(ConfigError::Invalid(format!(
        "sandbox.max_stack_size must be between {MIN_STACK_SIZE} and {MAX_STACK_SIZE} bytes, got {stack}"
      )));
    }
    if self.document.readiness_timeout_ms == 0 {
      return Err(ConfigError::Invalid(
        "document.readiness_timeout_ms must be positive".to_string(),
      ));
    }
    let mut names: Vec<&str> = self.document.dependencies.iter().map(|dep| dep.name.as_str()).collect();
    names.sort_unstable();
    if let Some(pair) = names.windows(2).find(|pair| pair[0] == pair[1]) {
      return Err(ConfigError::Invalid(format!("duplicate document dependency '{}'", pair[0])));
    }
    Ok(())
  }

  /// The configured build store file, else the default location.
  pub fn store_path(&self) -> PathBuf {
    self.store.path.clone().unwrap_or_else(store_file)
  }
}
