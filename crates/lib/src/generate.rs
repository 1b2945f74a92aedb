//! Build creation.
//!
//! Accepts a prompt from an authenticated caller and creates an empty build
//! for the generation pipeline to fill. Errors carry the HTTP status and
//! body an endpoint would answer with.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::TokenVerifier;
use crate::build::{Build, BuildStore, StoreError};
use crate::consts::TITLE_MAX_CHARS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
  pub initial_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
  /// Bearer token of the caller.
  #[serde(default)]
  pub token: Option<String>,
  pub prompt: Prompt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
  pub build_id: String,
}

#[derive(Debug, Error)]
pub enum GenerateError {
  #[error("You must be authenticated")]
  MissingToken,

  #[error("You are not authenticated")]
  Unauthenticated,

  #[error("Internal server error")]
  Internal(#[source] StoreError),
}

impl GenerateError {
  pub fn status(&self) -> u16 {
    match self {
      GenerateError::MissingToken => 400,
      GenerateError::Unauthenticated => 401,
      GenerateError::Internal(_) => 500,
    }
  }

  /// Response body for this failure.
  pub fn body(&self) -> Value {
    match self {
      GenerateError::Internal(_) => json!({ "success": false, "error": self.to_string() }),
      _ => json!({ "message": self.to_string() }),
    }
  }
}

/// First [`TITLE_MAX_CHARS`] characters of the prompt.
pub fn friendly_title(prompt: &str) -> String {
  prompt.chars().take(TITLE_MAX_CHARS).collect()
}

pub fn create_build(
  store: &impl BuildStore,
  verifier: &impl TokenVerifier,
  request: &GenerateRequest,
) -> Result<GenerateResponse, GenerateError> {
  let token = match request.token.as_deref() {
    Some(token) if !token.is_empty() => token,
    _ => {
      warn!("build creation without a token");
      return Err(GenerateError::MissingToken);
    }
  };
  let Some(principal) = verifier.verify(token) else {
    warn!("build creation with an invalid token");
    return Err(GenerateError::Unauthenticated);
  };

  let build_id = Uuid::new_v4().to_string();
  let title = friendly_title(&request.prompt.initial_prompt);
  let build = Build::new(build_id.clone(), title, Some(principal.id.clone()));

  store.insert(build).map_err(|err| {
    error!(error = %err, build = %build_id, "failed to create build");
    GenerateError::Internal(err)
  })?;

  info!(build = %build_id, owner = %principal.id, "created build");
  Ok(GenerateResponse { build_id })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::auth::{Principal, StaticTokenVerifier};
  use crate::build::{BuildSource, MemoryBuildStore, QueryState};
  use tracing_test::traced_test;

  struct FailingStore;

  impl BuildSource for FailingStore {
    fn lookup(&self, _id: &str) -> QueryState {
      QueryState::Ready(None)
    }
  }

  impl BuildStore for FailingStore {
    fn insert(&self, build: Build) -> Result<(), StoreError> {
      Err(StoreError::Duplicate(build.id))
    }

    fn list_by_owner(&self, _owner: &str) -> Result<Vec<Build>, StoreError> {
      Ok(Vec::new())
    }

    fn attach_code(&self, id: &str, _code: &str, _app_id: Option<&str>) -> Result<Build, StoreError> {
      Err(StoreError::NotFound(id.to_string()))
    }
  }

  fn verifier() -> StaticTokenVerifier {
    StaticTokenVerifier::new().with_token("tok", Principal::new("user-1"))
  }

  fn request(token: Option<&str>, prompt: &str) -> GenerateRequest {
    GenerateRequest {
      token: token.map(str::to_string),
      prompt: Prompt {
        initial_prompt: prompt.to_string(),
      },
    }
  }

  #[test]
  fn creates_a_build_owned_by_the_caller() {
    let store = MemoryBuildStore::new();
    let response = create_build(&store, &verifier(), &request(Some("tok"), "A todo app")).unwrap();

    assert!(Uuid::parse_str(&response.build_id).is_ok());
    match store.lookup(&response.build_id) {
      QueryState::Ready(Some(build)) => {
        assert_eq!(build.title, "A todo app");
        assert_eq!(build.owner.as_deref(), Some("user-1"));
        assert!(!build.is_previewable);
      }
      other => panic!("unexpected state: {other:?}"),
    }
    assert_eq!(
      serde_json::to_value(&response).unwrap(),
      json!({ "buildId": response.build_id })
    );
  }

  #[test]
  fn title_is_truncated_by_characters() {
    let prompt = "é".repeat(150);
    assert_eq!(friendly_title(&prompt).chars().count(), 100);
    assert_eq!(friendly_title("short"), "short");
  }

  #[test]
  fn missing_token_is_a_bad_request() {
    let store = MemoryBuildStore::new();
    for token in [None, Some("")] {
      let err = create_build(&store, &verifier(), &request(token, "x")).unwrap_err();
      assert_eq!(err.status(), 400);
      assert_eq!(err.body(), json!({ "message": "You must be authenticated" }));
    }
  }

  #[test]
  #[traced_test]
  fn unknown_token_is_unauthorized() {
    let err = create_build(&MemoryBuildStore::new(), &verifier(), &request(Some("nope"), "x")).unwrap_err();
    assert_eq!(err.status(), 401);
    assert_eq!(err.body(), json!({ "message": "You are not authenticated" }));
    assert!(logs_contain("build creation with an invalid token"));
    assert!(!logs_contain("nope"));
  }

  #[test]
  fn store_failure_is_an_internal_error() {
    let err = create_build(&FailingStore, &verifier(), &request(Some("tok"), "x")).unwrap_err();
    assert_eq!(err.status(), 500);
    assert_eq!(err.body(), json!({ "success": false, "error": "Internal server error" }));
  }

  #[test]
  fn request_parses_from_endpoint_json() {
    let request: GenerateRequest =
      serde_json::from_str(r#"{"token":"tok","prompt":{"initialPrompt":"Make a timer"}}"#).unwrap();
    assert_eq!(request.prompt.initial_prompt, "Make a timer");
  }
}
