//! Where buildlab keeps its config and data.
//!
//! Explicit overrides (`BUILDLAB_CONFIG`, `BUILDLAB_STORE`) win over the
//! platform directories.

use std::env;
use std::path::PathBuf;

use crate::consts::{APP_NAME, CONFIG_ENV, CONFIG_FILENAME, STORE_ENV, STORE_FILENAME};

fn env_path(name: &str) -> Option<PathBuf> {
  env::var_os(name).filter(|value| !value.is_empty()).map(PathBuf::from)
}

/// The user's home directory, or the working directory when unknown.
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  env_path("USERPROFILE").unwrap_or_else(|| PathBuf::from("."))
}

/// The user's home directory, or the working directory when unknown.
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  env_path("HOME").unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(windows)]
pub fn config_dir() -> PathBuf {
  env_path("APPDATA").unwrap_or_else(home_dir).join(APP_NAME)
}

#[cfg(not(windows))]
pub fn config_dir() -> PathBuf {
  env_path("XDG_CONFIG_HOME")
    .unwrap_or_else(|| home_dir().join(".config"))
    .join(APP_NAME)
}

#[cfg(windows)]
pub fn data_dir() -> PathBuf {
  env_path("LOCALAPPDATA").unwrap_or_else(home_dir).join(APP_NAME)
}

#[cfg(not(windows))]
pub fn data_dir() -> PathBuf {
  env_path("XDG_DATA_HOME")
    .unwrap_or_else(|| home_dir().join(".local").join("share"))
    .join(APP_NAME)
}

/// `$BUILDLAB_CONFIG`, else `buildlab.toml` in the config directory.
pub fn config_file() -> PathBuf {
  env_path(CONFIG_ENV).unwrap_or_else(|| config_dir().join(CONFIG_FILENAME))
}

/// `$BUILDLAB_STORE`, else `builds.json` in the data directory.
pub fn store_file() -> PathBuf {
  env_path(STORE_ENV).unwrap_or_else(|| data_dir().join(STORE_FILENAME))
}

#[cfg(test)]
#[cfg(not(windows))]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn xdg_dirs_take_precedence() {
    temp_env::with_vars(
      [
        ("XDG_CONFIG_HOME", Some("/custom/config")),
        ("XDG_DATA_HOME", Some("/custom/data")),
        ("HOME", Some("/home/user")),
        (CONFIG_ENV, None),
        (STORE_ENV, None),
      ],
      || {
        assert_eq!(config_file(), PathBuf::from("/custom/config/buildlab/buildlab.toml"));
        assert_eq!(store_file(), PathBuf::from("/custom/data/buildlab/builds.json"));
      },
    );
  }

  #[test]
  #[serial]
  fn falls_back_to_home_directories() {
    temp_env::with_vars(
      [
        ("XDG_CONFIG_HOME", None::<&str>),
        ("XDG_DATA_HOME", None::<&str>),
        ("HOME", Some("/home/user")),
      ],
      || {
        assert_eq!(config_dir(), PathBuf::from("/home/user/.config/buildlab"));
        assert_eq!(data_dir(), PathBuf::from("/home/user/.local/share/buildlab"));
      },
    );
  }

  #[test]
  #[serial]
  fn explicit_overrides_win() {
    temp_env::with_vars(
      [
        (CONFIG_ENV, Some("/etc/buildlab.toml")),
        (STORE_ENV, Some("/srv/builds.json")),
        ("XDG_CONFIG_HOME", Some("/custom/config")),
      ],
      || {
        assert_eq!(config_file(), PathBuf::from("/etc/buildlab.toml"));
        assert_eq!(store_file(), PathBuf::from("/srv/builds.json"));
      },
    );
  }

  #[test]
  #[serial]
  fn empty_override_is_ignored() {
    temp_env::with_vars([(STORE_ENV, Some("")), ("XDG_DATA_HOME", Some("/d"))], || {
      assert_eq!(store_file(), PathBuf::from("/d/buildlab/builds.json"));
    });
  }
}
