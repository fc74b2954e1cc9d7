//! Credential lifecycle management.
//!
//! `CredentialManager` memoizes one bearer credential per settings snapshot
//! and reissues it when the snapshot changes or the credential expires.
//! Refresh is single-flight: concurrent callers seeing a stale or missing
//! credential produce exactly one identity-provider call.

use chrono::{DateTime, Duration, Utc};
use garde::Validate;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::Settings;

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// A credential this close to expiry counts as expired.
const EXPIRY_SKEW_SECS: i64 = 30;

/// A bearer credential tied to the settings snapshot it was issued for.
#[derive(Debug, Clone)]
pub struct Credential {
    token: String,
    expires_at: DateTime<Utc>,
    config_hash: u64,
}

impl Credential {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_SKEW_SECS) >= self.expires_at
    }
}

/// A freshly issued token, before it is bound to a settings fingerprint.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues bearer tokens for a service identity. Implemented by
/// [`ServiceAccountIdentity`] in production and by counting mocks in tests.
pub trait IdentityProvider {
    fn issue_token(
        &self,
        email: &str,
        key_pem: &str,
        scope: &str,
    ) -> impl std::future::Future<Output = Result<IssuedToken, AuthError>> + Send;
}

/// Owns the cached credential and the current settings snapshot.
pub struct CredentialManager<I> {
    identity: I,
    settings: std::sync::RwLock<Settings>,
    // Held across the refresh await, which serializes concurrent refreshes.
    cached: Mutex<Option<Credential>>,
}

impl<I: IdentityProvider> CredentialManager<I> {
    pub fn new(identity: I, settings: Settings) -> Self {
        Self {
            identity,
            settings: std::sync::RwLock::new(settings),
            cached: Mutex::new(None),
        }
    }

    /// Replace the settings snapshot. The next `token()` call reissues the
    /// credential even if the old one has not expired.
    pub fn update_settings(&self, settings: Settings) {
        let mut current = self.settings.write().expect("settings lock poisoned");
        *current = settings;
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().expect("settings lock poisoned").clone()
    }

    /// Return a credential valid for the current settings, issuing a fresh
    /// one if the cache is empty, stale, or expired.
    pub async fn token(&self) -> Result<Credential, AuthError> {
        let settings = self.settings();
        settings
            .validate()
            .map_err(|report| AuthError::ConfigInvalid(report.to_string()))?;
        let fingerprint = settings.fingerprint();

        let mut slot = self.cached.lock().await;
        if let Some(credential) = slot.as_ref() {
            if credential.config_hash == fingerprint && !credential.is_expired() {
                return Ok(credential.clone());
            }
        }

        tracing::debug!(config_hash = fingerprint, "Issuing fresh credential");
        let issued = self
            .identity
            .issue_token(&settings.svc_email, &settings.svc_key, CLOUD_PLATFORM_SCOPE)
            .await?;

        let credential = Credential {
            token: issued.token,
            expires_at: issued.expires_at,
            config_hash: fingerprint,
        };
        *slot = Some(credential.clone());
        Ok(credential)
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// OAuth 2.0 JWT-bearer grant for a Google service account: an RS256-signed
/// assertion exchanged for an access token.
pub struct ServiceAccountIdentity {
    http: reqwest::Client,
    token_uri: String,
}

impl ServiceAccountIdentity {
    pub fn new() -> Self {
        Self::with_token_uri(DEFAULT_TOKEN_URI)
    }

    pub fn with_token_uri(token_uri: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_uri: token_uri.into(),
        }
    }
}

impl Default for ServiceAccountIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for ServiceAccountIdentity {
    async fn issue_token(
        &self,
        email: &str,
        key_pem: &str,
        scope: &str,
    ) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let claims = AssertionClaims {
            iss: email,
            scope,
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        let key = EncodingKey::from_rsa_pem(key_pem.as_bytes())?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &key)?;

        let params = [("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)];
        let response = self.http.post(&self.token_uri).form(&params).send().await?;

        let status = response.status();
        if status.is_success() {
            let body: TokenResponse = response.json().await?;
            Ok(IssuedToken {
                token: body.access_token,
                expires_at: now + Duration::seconds(body.expires_in),
            })
        } else {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            tracing::error!(status = %status, "Identity provider rejected token request");
            Err(AuthError::Rejected(message))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("required settings are missing: {0}")]
    ConfigInvalid(String),

    #[error("identity provider rejected the credential request: {0}")]
    Rejected(String),

    #[error("invalid service account key: {0}")]
    Key(#[from] jsonwebtoken::errors::Error),

    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),
}
