//! Export authorization
//!
//! Credential paths, checked in order:
//! 1. `x-api-key` equal to the configured shared secret
//! 2. `Authorization: Bearer <id token>` verified by the identity provider
//!
//! Anything else is rejected. The result records identity provenance only;
//! there are no roles or scopes.

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const API_KEY_HEADER: &str = "x-api-key";

const BEARER_PREFIX: &str = "Bearer ";

/// Bound applied when the caller does not configure one.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Types
// ============================================================================

/// Who made the request and how they proved it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum AuthResult {
    ApiKey,
    Firebase {
        uid: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        email: Option<String>,
    },
}

/// Identity extracted from a verified ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token rejected: {0}")]
    Rejected(String),

    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("identity provider not configured: {0}")]
    NotConfigured(String),

    #[error("verification timed out after {0:?}")]
    Timeout(Duration),
}

/// Every variant means the request is unauthorized; the variant is kept for
/// diagnostics only.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credentials supplied")]
    MissingCredentials,

    #[error("api key mismatch and no bearer token")]
    ApiKeyMismatch,

    #[error("bearer token verification failed: {0}")]
    InvalidToken(#[from] VerifyError),
}

/// External identity provider seam.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedIdentity, VerifyError>;
}

// ============================================================================
// Authorizer
// ============================================================================

pub struct Authorizer {
    api_key: Option<String>,
    verifier: Arc<dyn IdentityVerifier>,
    timeout: Duration,
}

impl Authorizer {
    /// A blank `api_key` counts as not configured.
    pub fn new(api_key: Option<String>, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            verifier,
            timeout: DEFAULT_VERIFY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api_key_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn authorize(&self, headers: &HeaderMap) -> Result<AuthResult, AuthError> {
        let presented_key = header_str(headers, API_KEY_HEADER);

        if let (Some(expected), Some(presented)) = (self.api_key.as_deref(), presented_key) {
            if presented == expected {
                return Ok(AuthResult::ApiKey);
            }
        }

        if let Some(token) = bearer_token(headers) {
            if token.is_empty() {
                return Err(VerifyError::Malformed("empty bearer token".to_string()).into());
            }

            let identity = tokio::time::timeout(self.timeout, self.verifier.verify_id_token(token))
                .await
                .map_err(|_| VerifyError::Timeout(self.timeout))??;

            return Ok(AuthResult::Firebase {
                uid: identity.uid,
                email: identity.email,
            });
        }

        if presented_key.is_some() {
            Err(AuthError::ApiKeyMismatch)
        } else {
            Err(AuthError::MissingCredentials)
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: impl header::AsHeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Token from an `Authorization: Bearer <token>` header, trimmed.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, header::AUTHORIZATION)
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
}
