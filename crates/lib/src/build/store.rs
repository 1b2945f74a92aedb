//! Build lookup and persistence.
//!
//! # Storage Layout
//!
//! [`FileBuildStore`] keeps every build in one JSON document:
//!
//! ```text
//! {data_dir}/builds.json
//! { "version": 1, "builds": [ { "id": ..., "title": ..., ... } ] }
//! ```
//!
//! Writes go to a temporary file in the same directory which is then
//! renamed over the store, so readers never see a partial file.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::types::{Build, QueryState};
use crate::platform::paths::store_file;

/// Current on-disk format version.
const STORE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("failed to read build store {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write build store {}: {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse build store {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to serialize build store: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("unsupported build store version: {0}")]
  UnsupportedVersion(u32),

  #[error("build not found: {0}")]
  NotFound(String),

  #[error("build already exists: {0}")]
  Duplicate(String),
}

/// Read side: resolves a build id to a query state.
pub trait BuildSource {
  fn lookup(&self, id: &str) -> QueryState;
}

/// Write side, plus listing.
pub trait BuildStore: BuildSource {
  fn insert(&self, build: Build) -> Result<(), StoreError>;

  /// Builds created by `owner`, newest first.
  fn list_by_owner(&self, owner: &str) -> Result<Vec<Build>, StoreError>;

  /// Store generated code on an existing build and mark it previewable.
  fn attach_code(&self, id: &str, code: &str, app_id: Option<&str>) -> Result<Build, StoreError>;
}

fn apply_code(build: &mut Build, code: &str, app_id: Option<&str>) {
  build.code = code.to_string();
  build.is_previewable = build.has_code();
  if let Some(app_id) = app_id {
    build.app_id = Some(app_id.to_string());
  }
}

fn newest_first(mut builds: Vec<Build>) -> Vec<Build> {
  builds.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
  builds
}

// =============================================================================
// In-memory store
// =============================================================================

#[derive(Debug, Default)]
struct MemoryState {
  builds: BTreeMap<String, Build>,
  pending: HashSet<String>,
  failures: HashMap<String, String>,
}

/// Process-local store. Ids can be marked pending or failing to exercise the
/// loading and error states of consumers.
#[derive(Debug, Default)]
pub struct MemoryBuildStore {
  state: Mutex<MemoryState>,
}

impl MemoryBuildStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn state(&self) -> MutexGuard<'_, MemoryState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Report `id` as still loading until [`resolve`](Self::resolve) is called.
  pub fn mark_pending(&self, id: &str) {
    self.state().pending.insert(id.to_string());
  }

  /// Report lookups of `id` as failed with `message`.
  pub fn mark_failed(&self, id: &str, message: &str) {
    self.state().failures.insert(id.to_string(), message.to_string());
  }

  /// Clear any pending or failing mark on `id`.
  pub fn resolve(&self, id: &str) {
    let mut state = self.state();
    state.pending.remove(id);
    state.failures.remove(id);
  }
}

impl BuildSource for MemoryBuildStore {
  fn lookup(&self, id: &str) -> QueryState {
    let state = self.state();
    if state.pending.contains(id) {
      return QueryState::Loading;
    }
    if let Some(message) = state.failures.get(id) {
      return QueryState::Failed(message.clone());
    }
    QueryState::Ready(state.builds.get(id).cloned())
  }
}

impl BuildStore for MemoryBuildStore {
  fn insert(&self, build: Build) -> Result<(), StoreError> {
    let mut state = self.state();
    if state.builds.contains_key(&build.id) {
      return Err(StoreError::Duplicate(build.id));
    }
    state.builds.insert(build.id.clone(), build);
    Ok(())
  }

  fn list_by_owner(&self, owner: &str) -> Result<Vec<Build>, StoreError> {
    let state = self.state();
    let owned = state
      .builds
      .values()
      .filter(|build| build.owner.as_deref() == Some(owner))
      .cloned()
      .collect();
    Ok(newest_first(owned))
  }

  fn attach_code(&self, id: &str, code: &str, app_id: Option<&str>) -> Result<Build, StoreError> {
    let mut state = self.state();
    let build = state
      .builds
      .get_mut(id)
      .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
    apply_code(build, code, app_id);
    Ok(build.clone())
  }
}

// =============================================================================
// File store
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
  version: u32,
  builds: Vec<Build>,
}

impl StoreFile {
  fn empty() -> Self {
    Self {
      version: STORE_VERSION,
      builds: Vec::new(),
    }
  }
}

/// Builds persisted in a single JSON file.
#[derive(Debug, Clone)]
pub struct FileBuildStore {
  path: PathBuf,
}

impl FileBuildStore {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  /// Store at `$BUILDLAB_STORE` or the platform data directory, e.g.
  /// `~/.local/share/buildlab/builds.json`.
  pub fn default_store() -> Self {
    Self::new(store_file())
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Load the store. A missing file is an empty store.
  fn load(&self) -> Result<StoreFile, StoreError> {
    let content = match fs::read_to_string(&self.path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StoreFile::empty()),
      Err(source) => {
        return Err(StoreError::Read {
          path: self.path.clone(),
          source,
        });
      }
    };

    let file: StoreFile = serde_json::from_str(&content).map_err(|source| StoreError::Parse {
      path: self.path.clone(),
      source,
    })?;
    if file.version != STORE_VERSION {
      return Err(StoreError::UnsupportedVersion(file.version));
    }
    Ok(file)
  }

  fn save(&self, file: &StoreFile) -> Result<(), StoreError> {
    let write_err = |source: io::Error| StoreError::Write {
      path: self.path.clone(),
      source,
    };
    let dir = match self.path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
      _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(write_err)?;

    let content = serde_json::to_string_pretty(file).map_err(StoreError::Serialize)?;
    let mut temp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
    temp.write_all(content.as_bytes()).map_err(write_err)?;
    temp.persist(&self.path).map_err(|e| write_err(e.error))?;

    debug!(path = %self.path.display(), builds = file.builds.len(), "saved build store");
    Ok(())
  }

  /// Load, modify and save.
  fn update<R>(&self, f: impl FnOnce(&mut StoreFile) -> Result<R, StoreError>) -> Result<R, StoreError> {
    let mut file = self.load()?;
    let result = f(&mut file)?;
    self.save(&file)?;
    Ok(result)
  }
}

impl BuildSource for FileBuildStore {
  fn lookup(&self, id: &str) -> QueryState {
    match self.load() {
      Ok(file) => QueryState::Ready(file.builds.into_iter().find(|build| build.id == id)),
      Err(err) => {
        warn!(error = %err, build = id, "build lookup failed");
        QueryState::Failed(err.to_string())
      }
    }
  }
}

impl BuildStore for FileBuildStore {
  fn insert(&self, build: Build) -> Result<(), StoreError> {
    info!(build = %build.id, "creating build");
    self.update(|file| {
      if file.builds.iter().any(|existing| existing.id == build.id) {
        return Err(StoreError::Duplicate(build.id.clone()));
      }
      file.builds.push(build);
      Ok(())
    })
  }

  fn list_by_owner(&self, owner: &str) -> Result<Vec<Build>, StoreError> {
    let file = self.load()?;
    let owned = file
      .builds
      .into_iter()
      .filter(|build| build.owner.as_deref() == Some(owner))
      .collect();
    Ok(newest_first(owned))
  }

  fn attach_code(&self, id: &str, code: &str, app_id: Option<&str>) -> Result<Build, StoreError> {
    info!(build = id, bytes = code.len(), "attaching generated code");
    self.update(|file| {
      let build = file
        .builds
        .iter_mut()
        .find(|build| build.id == id)
        .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
      apply_code(build, code, app_id);
      Ok(build.clone())
    })
  }
}
