//! Bearer-token verification.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
  pub id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
}

impl Principal {
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      email: None,
    }
  }
}

/// Resolves a bearer token to the principal it was issued to. `None` means
/// the caller is not authenticated.
pub trait TokenVerifier {
  fn verify(&self, token: &str) -> Option<Principal>;
}

/// One `[[auth.tokens]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
  pub token: String,
  pub user: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
}

/// `[auth]` settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
  pub tokens: Vec<TokenEntry>,
}

/// Verifies against a fixed token table.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
  tokens: HashMap<String, Principal>,
}

impl StaticTokenVerifier {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_config(config: &AuthConfig) -> Self {
    config
      .tokens
      .iter()
      .fold(Self::new(), |verifier, entry| {
        verifier.with_token(
          &entry.token,
          Principal {
            id: entry.user.clone(),
            email: entry.email.clone(),
          },
        )
      })
  }

  pub fn with_token(mut self, token: &str, principal: Principal) -> Self {
    self.tokens.insert(token.to_string(), principal);
    self
  }
}

impl TokenVerifier for StaticTokenVerifier {
  fn verify(&self, token: &str) -> Option<Principal> {
    let principal = self.tokens.get(token).cloned();
    debug!(verified = principal.is_some(), "verified bearer token");
    principal
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn verifies_configured_tokens_only() {
    let config = AuthConfig {
      tokens: vec![TokenEntry {
        token: "secret".to_string(),
        user: "user-1".to_string(),
        email: Some("dev@example.com".to_string()),
      }],
    };
    let verifier = StaticTokenVerifier::from_config(&config);

    let principal = verifier.verify("secret").unwrap();
    assert_eq!(principal.id, "user-1");
    assert_eq!(principal.email.as_deref(), Some("dev@example.com"));
    assert_eq!(verifier.verify("Secret"), None);
    assert_eq!(verifier.verify(""), None);
  }
}
