//! Access tokens for the Google APIs.
//!
//! A static token suits development and tests. Deployments use a service
//! account key: a signed JWT assertion is exchanged for an access token,
//! which is cached and refreshed shortly before it expires.

use crate::error::{ProviderError, ProviderResult};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use tokio::sync::Mutex;

/// OAuth scopes requested for service account tokens.
pub const GOOGLE_SCOPES: &str =
    "https://www.googleapis.com/auth/drive https://www.googleapis.com/auth/spreadsheets";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Source of bearer tokens for provider calls.
#[async_trait]
pub trait TokenSource: Send + Sync + 'static {
    /// A token valid for at least the next request.
    async fn access_token(&self) -> ProviderResult<String>;

    /// Forget any cached token after the API rejected it.
    async fn invalidate(&self) {}
}

/// A fixed token, never refreshed.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> ProviderResult<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ProviderError::Config(
                "google access token must not be empty".to_string(),
            ));
        }
        Ok(Self(token))
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> ProviderResult<String> {
        Ok(self.0.clone())
    }
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a service account JSON key file that token minting needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ProviderError::Config(format!("invalid service account key: {e}")))
    }

    pub fn from_file(path: &Path) -> ProviderResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::Config(format!(
                "failed to read service account key {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&json)
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[redacted]")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME_SECS as u64
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Tokens minted from a service account key with the JWT bearer grant.
pub struct ServiceAccountTokens {
    http: reqwest::Client,
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    policy: RetryPolicy,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokens {
    pub fn new(key: ServiceAccountKey, policy: RetryPolicy) -> ProviderResult<Self> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            ProviderError::Config(format!("invalid service account private key: {e}"))
        })?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("sheetbase/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            key,
            signing_key,
            policy,
            cached: Mutex::new(None),
        })
    }

    fn assertion(&self) -> ProviderResult<String> {
        let iat = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: GOOGLE_SCOPES,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        encode(&header, &claims, &self.signing_key)
            .map_err(|e| ProviderError::Config(format!("failed to sign token assertion: {e}")))
    }

    async fn request_token(&self, assertion: &str) -> ProviderResult<TokenResponse> {
        let params = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)];
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&params)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let detail: String = body.chars().take(200).collect();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                message: format!("token exchange failed: {detail}"),
            });
        }
        serde_json::from_str(&body)
            .map_err(|e| ProviderError::Decode(format!("token response: {e}")))
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokens {
    async fn access_token(&self) -> ProviderResult<String> {
        // Held across the exchange so concurrent callers share one refresh.
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let assertion = self.assertion()?;
        let response = self
            .policy
            .run("fetch_token", || self.request_token(&assertion))
            .await?;
        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(REFRESH_MARGIN);
        tracing::debug!(
            client_email = %self.key.client_email,
            expires_in = response.expires_in,
            "Refreshed provider access token"
        );
        *cached = Some(CachedToken {
            value: response.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(response.access_token)
    }

    async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}
