//! Bearer credential verification.

use crate::error::ApiResult;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sheetbase_core::config::AuthConfig;
use std::collections::HashMap;

/// A verified caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    /// Stable subject identifier.
    pub subject: String,
    pub email: Option<String>,
}

/// Maps a bearer credential to an identity.
#[async_trait]
pub trait IdentityVerifier: Send + Sync + 'static {
    /// Verify a bearer token. `Ok(None)` means the token is not recognized.
    async fn verify(&self, token: &str) -> ApiResult<Option<Identity>>;
}

/// Verifier backed by a fixed set of SHA-256 token hashes from configuration.
#[derive(Debug, Default)]
pub struct StaticTokenVerifier {
    by_hash: HashMap<String, Identity>,
}

impl StaticTokenVerifier {
    pub fn from_config(config: &AuthConfig) -> Self {
        let by_hash = config
            .tokens
            .iter()
            .map(|t| {
                (
                    t.token_hash.to_ascii_lowercase(),
                    Identity {
                        subject: t.subject.clone(),
                        email: t.email.clone(),
                    },
                )
            })
            .collect();
        Self { by_hash }
    }
}

#[async_trait]
impl IdentityVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> ApiResult<Option<Identity>> {
        Ok(self.by_hash.get(&hash_token(token)).cloned())
    }
}

/// Hash a token for lookup.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
