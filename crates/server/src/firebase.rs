//! Firebase ID token verification
//!
//! Performs the same checks as the admin SDK's `verifyIdToken`:
//! - RS256 signature against Google's secure-token keys (looked up by `kid`)
//! - `aud` equal to the project id, `iss` bound to the project
//! - `exp` in the future, `sub` non-empty and at most 128 characters
//!
//! The provider app is initialized lazily, at most once per process. A failed
//! initialization is not retained, so a later request can retry it.

use crate::auth::{IdentityVerifier, VerifiedIdentity, VerifyError};
use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::{OnceCell, RwLock};

pub const SECURE_TOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// Used when the key endpoint sends no usable `Cache-Control: max-age`.
const DEFAULT_KEY_MAX_AGE: Duration = Duration::from_secs(3600);

/// Minimum spacing between key fetches triggered by an unknown `kid`.
const MIN_KEY_REFRESH: Duration = Duration::from_secs(60);

const MAX_UID_LEN: usize = 128;

/// Ambient project id sources, in lookup order.
const AMBIENT_PROJECT_VARS: &[&str] = &["GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"];

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone)]
pub struct FirebaseSettings {
    /// Service-account JSON blob; its `project_id` wins over everything else
    pub service_account: Option<String>,
    /// Explicit project id for ambient credentials
    pub project_id: Option<String>,
    /// Timeout for each call to the key endpoint
    pub request_timeout: Duration,
    pub jwks_url: String,
}

impl Default for FirebaseSettings {
    fn default() -> Self {
        Self {
            service_account: None,
            project_id: None,
            request_timeout: crate::auth::DEFAULT_VERIFY_TIMEOUT,
            jwks_url: SECURE_TOKEN_JWKS_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServiceAccount {
    project_id: String,
}

/// Resolve the project the tokens must be issued for.
fn resolve_project_id(settings: &FirebaseSettings) -> Result<String, VerifyError> {
    if let Some(blob) = non_blank(settings.service_account.as_deref()) {
        let account: ServiceAccount = serde_json::from_str(blob).map_err(|e| {
            VerifyError::NotConfigured(format!("invalid service account JSON: {}", e))
        })?;
        return non_blank(Some(&account.project_id))
            .map(str::to_string)
            .ok_or_else(|| {
                VerifyError::NotConfigured("service account has an empty project_id".to_string())
            });
    }

    if let Some(project_id) = non_blank(settings.project_id.as_deref()) {
        return Ok(project_id.to_string());
    }

    AMBIENT_PROJECT_VARS
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
        .ok_or_else(|| {
            VerifyError::NotConfigured(
                "no service account and no ambient project id available".to_string(),
            )
        })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ============================================================================
// Provider app
// ============================================================================

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

struct CachedKeys {
    set: JwkSet,
    fetched_at: Instant,
    expires_at: Instant,
}

struct FirebaseApp {
    project_id: String,
    issuer: String,
    jwks_url: String,
    client: reqwest::Client,
    keys: RwLock<Option<CachedKeys>>,
}

impl FirebaseApp {
    fn initialize(settings: &FirebaseSettings) -> Result<Self, VerifyError> {
        let project_id = resolve_project_id(settings)?;
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| VerifyError::ProviderUnavailable(e.to_string()))?;

        tracing::info!(project_id = %project_id, "identity provider initialized");

        Ok(Self {
            issuer: format!("{}{}", ISSUER_PREFIX, project_id),
            project_id,
            jwks_url: settings.jwks_url.clone(),
            client,
            keys: RwLock::new(None),
        })
    }

    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, VerifyError> {
        let header =
            jsonwebtoken::decode_header(token).map_err(|e| VerifyError::Malformed(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(VerifyError::Rejected(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| VerifyError::Malformed("token header has no kid".to_string()))?;

        let key = self.signing_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);

        let claims = jsonwebtoken::decode::<IdTokenClaims>(token, &key, &validation)
            .map_err(|e| VerifyError::Rejected(e.to_string()))?
            .claims;

        if claims.sub.is_empty() || claims.sub.len() > MAX_UID_LEN {
            return Err(VerifyError::Rejected("invalid subject claim".to_string()));
        }

        Ok(VerifiedIdentity {
            uid: claims.sub,
            email: claims.email,
        })
    }

    /// Key for `kid`, refreshing the cache when it is stale or the key rotated.
    /// An unknown `kid` refetches at most once per `MIN_KEY_REFRESH`.
    async fn signing_key(&self, kid: &str) -> Result<DecodingKey, VerifyError> {
        {
            let guard = self.keys.read().await;
            if let Some(cached) = guard.as_ref() {
                let now = Instant::now();
                if cached.expires_at > now {
                    if let Some(jwk) = cached.set.find(kid) {
                        return decoding_key(jwk);
                    }
                    if now.duration_since(cached.fetched_at) < MIN_KEY_REFRESH {
                        return Err(unknown_key(kid));
                    }
                }
            }
        }

        let fresh = self.fetch_keys().await?;
        let key = fresh
            .set
            .find(kid)
            .ok_or_else(|| unknown_key(kid))
            .and_then(decoding_key);
        *self.keys.write().await = Some(fresh);
        key
    }

    async fn fetch_keys(&self) -> Result<CachedKeys, VerifyError> {
        let unavailable = |e: reqwest::Error| VerifyError::ProviderUnavailable(e.to_string());

        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?;

        let max_age = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(DEFAULT_KEY_MAX_AGE);

        let set: JwkSet = response.json().await.map_err(unavailable)?;
        tracing::debug!(keys = set.keys.len(), ?max_age, "fetched identity provider keys");

        let fetched_at = Instant::now();
        Ok(CachedKeys {
            set,
            fetched_at,
            expires_at: fetched_at + max_age,
        })
    }
}

fn unknown_key(kid: &str) -> VerifyError {
    VerifyError::Rejected(format!("unknown signing key {}", kid))
}

fn decoding_key(jwk: &jsonwebtoken::jwk::Jwk) -> Result<DecodingKey, VerifyError> {
    DecodingKey::from_jwk(jwk).map_err(|e| VerifyError::ProviderUnavailable(e.to_string()))
}

/// `max-age` seconds from a `Cache-Control` value.
fn parse_max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .map(str::trim)
        .find_map(|directive| directive.strip_prefix("max-age="))
        .and_then(|secs| secs.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

// ============================================================================
// Verifier
// ============================================================================

/// Lazily initialized Firebase token verifier.
pub struct FirebaseVerifier {
    settings: FirebaseSettings,
    app: OnceCell<FirebaseApp>,
}

impl FirebaseVerifier {
    pub fn new(settings: FirebaseSettings) -> Self {
        Self {
            settings,
            app: OnceCell::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.app.initialized()
    }

    async fn app(&self) -> Result<&FirebaseApp, VerifyError> {
        self.app
            .get_or_try_init(|| async { FirebaseApp::initialize(&self.settings) })
            .await
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedIdentity, VerifyError> {
        self.app().await?.verify(token).await
    }
}

static GLOBAL_FIREBASE_VERIFIER: OnceLock<Arc<FirebaseVerifier>> = OnceLock::new();

/// Process-wide verifier. The first caller's settings are kept.
pub fn global_firebase_verifier(settings: &FirebaseSettings) -> Arc<FirebaseVerifier> {
    GLOBAL_FIREBASE_VERIFIER
        .get_or_init(|| Arc::new(FirebaseVerifier::new(settings.clone())))
        .clone()
}
