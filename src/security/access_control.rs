//! Identity admission gate.
//!
//! # Responsibilities
//! - Define the [`IdentityVerifier`] capability used to check access tokens
//! - Enforce `access.required`: token present, verified, audience accepted
//! - Bound the verifier call with a timeout
//!
//! # Design Decisions
//! - Fail closed: missing tokens, verifier errors and timeouts all deny
//! - Token cryptography lives behind the trait; this module only checks the
//!   audiences the verifier reports

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::schema::AccessConfig;

/// Errors reported by an [`IdentityVerifier`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("token rejected: {0}")]
    Rejected(String),
    #[error("verifier unavailable: {0}")]
    Unavailable(String),
}

/// Verifies an identity token for a team and reports its audiences.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str, team_name: &str) -> Result<Vec<String>, VerifyError>;
}

/// Verifier used when none is wired up. Every token is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectingVerifier;

#[async_trait]
impl IdentityVerifier for RejectingVerifier {
    async fn verify(&self, _token: &str, _team_name: &str) -> Result<Vec<String>, VerifyError> {
        Err(VerifyError::Unavailable("no identity verifier configured".into()))
    }
}

/// Accepts any non-empty token and reports a fixed set of audiences.
///
/// Useful for tests and for dry runs from the CLI.
#[derive(Debug, Clone, Default)]
pub struct StaticVerifier {
    team_name: Option<String>,
    audiences: Vec<String>,
}

impl StaticVerifier {
    pub fn new(audiences: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            team_name: None,
            audiences: audiences.into_iter().map(Into::into).collect(),
        }
    }

    /// Only accept tokens for this team.
    pub fn for_team(mut self, team_name: impl Into<String>) -> Self {
        self.team_name = Some(team_name.into());
        self
    }
}

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, token: &str, team_name: &str) -> Result<Vec<String>, VerifyError> {
        if token.is_empty() {
            return Err(VerifyError::Rejected("empty token".into()));
        }
        if let Some(expected) = &self.team_name {
            if expected != team_name {
                return Err(VerifyError::Rejected(format!("unknown team '{team_name}'")));
            }
        }
        Ok(self.audiences.clone())
    }
}

/// Result of the identity gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessVerdict {
    Granted,
    Denied(String),
    TimedOut,
}

/// Run the identity gate for one request.
///
/// When `access` is absent or not required the request is granted without
/// calling the verifier.
pub async fn check_access(
    access: Option<&AccessConfig>,
    token: Option<&str>,
    verifier: &dyn IdentityVerifier,
    timeout: Duration,
) -> AccessVerdict {
    let access = match access {
        Some(a) if a.required => a,
        _ => return AccessVerdict::Granted,
    };

    let token = match token {
        Some(t) if !t.is_empty() => t,
        _ => return AccessVerdict::Denied("missing identity token".into()),
    };

    match tokio::time::timeout(timeout, verifier.verify(token, &access.team_name)).await {
        Err(_) => AccessVerdict::TimedOut,
        Ok(Err(e)) => AccessVerdict::Denied(e.to_string()),
        Ok(Ok(audiences)) => {
            if audiences.iter().any(|aud| access.aud_tag.contains(aud)) {
                AccessVerdict::Granted
            } else {
                AccessVerdict::Denied("no accepted audience in token".into())
            }
        }
    }
}
