use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A generated component and its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
  pub id: String,
  pub title: String,
  /// Generated source. Empty until generation attaches it, and possibly
  /// malformed afterwards.
  #[serde(default)]
  pub code: String,
  /// Application the generated code's database client is bound to.
  #[serde(rename = "instantAppId", default, skip_serializing_if = "Option::is_none")]
  pub app_id: Option<String>,
  #[serde(default)]
  pub is_previewable: bool,
  /// Principal that created the build.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub owner: Option<String>,
  /// RFC 3339 creation time.
  pub created_at: String,
}

impl Build {
  /// A build without code, created now.
  pub fn new(id: impl Into<String>, title: impl Into<String>, owner: Option<String>) -> Self {
    Self {
      id: id.into(),
      title: title.into(),
      code: String::new(),
      app_id: None,
      is_previewable: false,
      owner,
      created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }
  }

  pub fn has_code(&self) -> bool {
    !self.code.trim().is_empty()
  }
}

/// Result of looking a build up. Loading and "not found" are distinct,
/// valid states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState {
  Loading,
  Failed(String),
  Ready(Option<Build>),
}
