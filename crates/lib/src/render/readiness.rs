//! Dependency readiness for the isolated document.
//!
//! A document declares N script dependencies that load independently and in
//! no particular order. [`ReadinessBarrier`] joins their signals:
//!
//! ```text
//! loading ──all loaded──▶ ready ──begin──▶ evaluating ──▶ rendered
//!    │                                          │
//!    └──any failed / timeout──▶ errored ◀───────┘
//! ```
//!
//! `errored` and `rendered` are terminal; later signals are ignored. The
//! inline loader of the generated document implements the same machine, and
//! [`preflight`] drives this one with real network probes.

use std::future::Future;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::document::Dependency;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyStatus {
  Unloaded,
  Loaded,
  Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  Loading,
  Ready,
  Evaluating,
  Rendered,
  Errored,
}

impl Phase {
  pub fn is_terminal(self) -> bool {
    matches!(self, Phase::Rendered | Phase::Errored)
  }
}

/// Why a barrier ended in `errored`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadinessError {
  #[error("dependency '{name}' failed to load: {message}")]
  DependencyFailed { name: String, message: String },

  #[error("dependencies not loaded after {timeout_ms} ms: {}", pending.join(", "))]
  TimedOut { timeout_ms: u64, pending: Vec<String> },

  #[error("{0}")]
  Evaluation(String),
}

#[derive(Debug, Clone)]
pub struct ReadinessBarrier {
  dependencies: Vec<(String, DependencyStatus)>,
  phase: Phase,
  timeout: Duration,
  error: Option<ReadinessError>,
}

impl ReadinessBarrier {
  /// A barrier over `names`. With no dependencies it starts out `ready`.
  pub fn new<I, S>(names: I, timeout: Duration) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let dependencies: Vec<_> = names
      .into_iter()
      .map(|name| (name.into(), DependencyStatus::Unloaded))
      .collect();
    let phase = if dependencies.is_empty() {
      Phase::Ready
    } else {
      Phase::Loading
    };
    Self {
      dependencies,
      phase,
      timeout,
      error: None,
    }
  }

  pub fn phase(&self) -> Phase {
    self.phase
  }

  pub fn timeout(&self) -> Duration {
    self.timeout
  }

  pub fn error(&self) -> Option<&ReadinessError> {
    self.error.as_ref()
  }

  pub fn status(&self, name: &str) -> Option<DependencyStatus> {
    self
      .dependencies
      .iter()
      .find(|(candidate, _)| candidate == name)
      .map(|(_, status)| *status)
  }

  /// Dependencies that have not signalled yet.
  pub fn pending(&self) -> Vec<&str> {
    self
      .dependencies
      .iter()
      .filter(|(_, status)| *status == DependencyStatus::Unloaded)
      .map(|(name, _)| name.as_str())
      .collect()
  }

  /// Record a successful load. Returns the phase afterwards.
  pub fn loaded(&mut self, name: &str) -> Phase {
    if self.accept_signal(name, DependencyStatus::Loaded) && self.pending().is_empty() {
      debug!("all dependencies loaded");
      self.phase = Phase::Ready;
    }
    self.phase
  }

  pub fn failed(&mut self, name: &str, message: &str) -> Phase {
    if self.accept_signal(name, DependencyStatus::Failed) {
      self.fail(ReadinessError::DependencyFailed {
        name: name.to_string(),
        message: message.to_string(),
      });
    }
    self.phase
  }

  /// The overall deadline passed. Only affects a barrier still loading.
  pub fn time_out(&mut self) -> Phase {
    if self.phase == Phase::Loading {
      let pending = self.pending().into_iter().map(str::to_string).collect();
      self.fail(ReadinessError::TimedOut {
        timeout_ms: self.timeout.as_millis() as u64,
        pending,
      });
    }
    self.phase
  }

  /// Move from `ready` to `evaluating`. Returns true exactly once per
  /// barrier.
  pub fn begin_evaluation(&mut self) -> bool {
    if self.phase != Phase::Ready {
      return false;
    }
    self.phase = Phase::Evaluating;
    true
  }

  /// Record the outcome of the single evaluation.
  pub fn finish(&mut self, outcome: Result<(), String>) -> Phase {
    if self.phase == Phase::Evaluating {
      match outcome {
        Ok(()) => self.phase = Phase::Rendered,
        Err(message) => self.fail(ReadinessError::Evaluation(message)),
      }
    }
    self.phase
  }

  fn accept_signal(&mut self, name: &str, status: DependencyStatus) -> bool {
    if self.phase != Phase::Loading {
      debug!(dependency = name, phase = ?self.phase, "ignoring late readiness signal");
      return false;
    }
    match self.dependencies.iter_mut().find(|(candidate, _)| candidate == name) {
      Some((_, current)) if *current == DependencyStatus::Unloaded => {
        *current = status;
        true
      }
      Some(_) => {
        debug!(dependency = name, "ignoring repeated readiness signal");
        false
      }
      None => {
        warn!(dependency = name, "readiness signal for an undeclared dependency");
        false
      }
    }
  }

  fn fail(&mut self, err: ReadinessError) {
    warn!(error = %err, "readiness barrier errored");
    self.phase = Phase::Errored;
    self.error = Some(err);
  }
}

// =============================================================================
// Preflight
// =============================================================================

#[derive(Debug, Error)]
pub enum PreflightError {
  #[error(transparent)]
  NotReady(#[from] ReadinessError),

  #[error("failed to create HTTP client: {0}")]
  Client(String),
}

/// Checks that a script URL can be fetched.
pub trait ScriptProbe: Clone + Send + Sync + 'static {
  fn probe(&self, url: &str) -> impl Future<Output = Result<(), String>> + Send;
}

/// Probes over HTTP(S); any non-success status counts as a failure.
#[derive(Debug, Clone)]
pub struct HttpProbe {
  client: reqwest::Client,
}

impl HttpProbe {
  pub fn new() -> Result<Self, PreflightError> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("buildlab/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| PreflightError::Client(e.to_string()))?;
    Ok(Self { client })
  }
}

impl ScriptProbe for HttpProbe {
  async fn probe(&self, url: &str) -> Result<(), String> {
    let response = self.client.get(url).send().await.map_err(|e| e.to_string())?;
    if !response.status().is_success() {
      return Err(format!("HTTP {}", response.status()));
    }
    Ok(())
  }
}

/// Outcome of probing one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyReport {
  pub name: String,
  pub url: String,
  pub status: DependencyStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub elapsed_ms: Option<u64>,
}

/// Probe every dependency concurrently and feed the results through a
/// [`ReadinessBarrier`] bounded by `timeout`.
///
/// Returns per-dependency reports when the barrier reached `ready`.
pub async fn preflight<P: ScriptProbe>(
  dependencies: &[Dependency],
  timeout: Duration,
  probe: &P,
) -> Result<Vec<DependencyReport>, PreflightError> {
  info!(count = dependencies.len(), timeout_ms = timeout.as_millis() as u64, "probing dependencies");

  let mut barrier = ReadinessBarrier::new(dependencies.iter().map(|dep| dep.name.clone()), timeout);
  let mut elapsed: Vec<(String, u64)> = Vec::new();
  let mut join_set = JoinSet::new();

  for dependency in dependencies {
    let probe = probe.clone();
    let name = dependency.name.clone();
    let url = dependency.url.clone();
    join_set.spawn(async move {
      let started = Instant::now();
      let result = probe.probe(&url).await;
      (name, result, started.elapsed())
    });
  }

  let joined = tokio::time::timeout(timeout, async {
    while let Some(join_result) = join_set.join_next().await {
      match join_result {
        Ok((name, Ok(()), took)) => {
          debug!(dependency = %name, elapsed_ms = took.as_millis() as u64, "dependency reachable");
          elapsed.push((name.clone(), took.as_millis() as u64));
          barrier.loaded(&name);
        }
        Ok((name, Err(message), _)) => {
          barrier.failed(&name, &message);
        }
        Err(e) => {
          error!(error = %e, "dependency probe panicked");
        }
      }
      if barrier.phase() != Phase::Loading {
        break;
      }
    }
  })
  .await;

  if joined.is_err() {
    barrier.time_out();
  } else if barrier.phase() == Phase::Loading {
    // Every task finished; the ones that never signalled panicked.
    for name in barrier.pending().into_iter().map(str::to_string).collect::<Vec<_>>() {
      barrier.failed(&name, "probe task panicked");
    }
  }
  join_set.abort_all();

  if let Some(err) = barrier.error() {
    return Err(err.clone().into());
  }

  Ok(
    dependencies
      .iter()
      .map(|dep| DependencyReport {
        name: dep.name.clone(),
        url: dep.url.clone(),
        status: barrier.status(&dep.name).unwrap_or(DependencyStatus::Unloaded),
        elapsed_ms: elapsed.iter().find(|(name, _)| *name == dep.name).map(|(_, ms)| *ms),
      })
      .collect(),
  )
}
