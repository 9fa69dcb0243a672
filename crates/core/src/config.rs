//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted request body for CSV uploads and row batches, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Enable the /metrics endpoint for Prometheus scraping.
    /// SECURITY: When enabled, restrict the endpoint at the network level.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

/// Dataset catalog configuration.
///
/// The container is the provider folder that holds one spreadsheet file per
/// department.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Provider folder id holding department files.
    #[serde(default = "default_container_id")]
    pub container_id: String,
    /// MIME type used to filter the folder listing.
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    /// Run a background reconciliation pass on this interval (disabled when unset).
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
}

fn default_container_id() -> String {
    "root".to_string()
}

fn default_mime_type() -> String {
    crate::SPREADSHEET_MIME_TYPE.to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            container_id: default_container_id(),
            mime_type: default_mime_type(),
            poll_interval_secs: None,
        }
    }
}

impl CatalogConfig {
    /// Get the poll interval, if background reconciliation is enabled.
    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_secs.map(Duration::from_secs)
    }

    /// Validate catalog configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.container_id.trim().is_empty() {
            return Err("catalog.container_id must not be empty".to_string());
        }
        if self.poll_interval_secs == Some(0) {
            return Err("catalog.poll_interval_secs cannot be 0; omit it to disable polling"
                .to_string());
        }
        Ok(())
    }
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database.
    Sqlite {
        /// Database file path.
        path: PathBuf,
        /// Query timeout in seconds (advisory only - SQLite cannot force-cancel queries).
        #[serde(default = "default_sqlite_query_timeout_secs")]
        query_timeout_secs: Option<u64>,
    },
}

fn default_sqlite_query_timeout_secs() -> Option<u64> {
    Some(30)
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/metadata.db"),
            query_timeout_secs: default_sqlite_query_timeout_secs(),
        }
    }
}

/// Tabular provider configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    /// In-process provider (development and tests; contents are lost on restart).
    Memory,
    /// Google Drive + Sheets REST APIs.
    Google {
        /// Drive API base URL.
        #[serde(default = "default_drive_base_url")]
        drive_base_url: String,
        /// Sheets API base URL.
        #[serde(default = "default_sheets_base_url")]
        sheets_base_url: String,
        /// Service account JSON key file; tokens are minted and refreshed from it.
        service_account_key_file: Option<PathBuf>,
        /// Fixed OAuth access token (development only; it is never refreshed).
        access_token: Option<String>,
        /// Environment variable holding a fixed OAuth access token.
        access_token_env: Option<String>,
        /// Per-call timeout in seconds.
        #[serde(default = "default_request_timeout_secs")]
        request_timeout_secs: u64,
        /// Attempts per call, including the first (1 disables retries).
        #[serde(default = "default_max_attempts")]
        max_attempts: u32,
        /// Base delay for exponential backoff between attempts.
        #[serde(default = "default_retry_base_delay_ms")]
        retry_base_delay_ms: u64,
    },
}

fn default_drive_base_url() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_sheets_base_url() -> String {
    "https://sheets.googleapis.com/v4".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    200
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::Memory
    }
}

impl ProviderConfig {
    /// Validate provider configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ProviderConfig::Memory => Ok(()),
            ProviderConfig::Google {
                service_account_key_file,
                access_token,
                access_token_env,
                request_timeout_secs,
                max_attempts,
                ..
            } => {
                let sources = [
                    service_account_key_file.is_some(),
                    access_token.is_some(),
                    access_token_env.is_some(),
                ]
                .into_iter()
                .filter(|set| *set)
                .count();
                match sources {
                    1 => {}
                    0 => {
                        return Err("google provider requires service_account_key_file, \
                             access_token or access_token_env"
                            .to_string());
                    }
                    _ => {
                        return Err("google provider accepts only one of \
                             service_account_key_file, access_token and access_token_env"
                            .to_string());
                    }
                }
                if *request_timeout_secs == 0 {
                    return Err("provider.request_timeout_secs must be at least 1".to_string());
                }
                if *max_attempts == 0 {
                    return Err("provider.max_attempts must be at least 1".to_string());
                }
                Ok(())
            }
        }
    }
}

/// A statically configured identity token.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentityTokenConfig {
    /// SHA256 hex of the bearer token (64 characters).
    /// Generate with: `echo -n "your-secret-token" | sha256sum`
    pub token_hash: String,
    /// Stable subject identifier the token resolves to.
    pub subject: String,
    /// Email reported for the subject.
    #[serde(default)]
    pub email: Option<String>,
}

/// Identity verification configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Accepted bearer tokens.
    #[serde(default)]
    pub tokens: Vec<IdentityTokenConfig>,
}

impl AuthConfig {
    /// Validate identity token entries.
    pub fn validate(&self) -> Result<(), String> {
        for (i, token) in self.tokens.iter().enumerate() {
            if token.token_hash.len() != 64
                || !token.token_hash.chars().all(|c| c.is_ascii_hexdigit())
            {
                return Err(format!(
                    "auth.tokens[{i}].token_hash must be 64 hex characters (sha256)"
                ));
            }
            if token.subject.trim().is_empty() {
                return Err(format!("auth.tokens[{i}].subject must not be empty"));
            }
        }
        Ok(())
    }

    /// Create a test configuration with one identity.
    ///
    /// **For testing only.** The token is `test-identity-token`.
    pub fn for_testing() -> Self {
        Self {
            tokens: vec![IdentityTokenConfig {
                // SHA256 of "test-identity-token"
                token_hash: "8f22ec858b05f39e761e1bf0df59c5ed37d5966700bb757ed315ba42069f0ddc"
                    .to_string(),
                subject: "test-subject".to_string(),
                email: Some("tester@example.com".to_string()),
            }],
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Dataset catalog configuration.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Tabular provider configuration.
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Identity verification configuration.
    #[serde(default)]
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses the in-memory provider and SQLite metadata.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            catalog: CatalogConfig {
                container_id: "test-folder".to_string(),
                ..Default::default()
            },
            metadata: MetadataConfig::default(),
            provider: ProviderConfig::Memory,
            auth: AuthConfig::for_testing(),
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.catalog.validate()?;
        self.provider.validate()?;
        self.auth.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_defaults_to_memory() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert!(matches!(config.provider, ProviderConfig::Memory));
        assert_eq!(config.catalog.mime_type, crate::SPREADSHEET_MIME_TYPE);
        assert!(config.catalog.poll_interval().is_none());
    }

    #[test]
    fn test_google_config_defaults() {
        let json = r#"{"type":"google","access_token_env":"SHEETBASE_TOKEN"}"#;
        let config: ProviderConfig = serde_json::from_str(json).unwrap();
        match config {
            ProviderConfig::Google {
                drive_base_url,
                request_timeout_secs,
                max_attempts,
                ..
            } => {
                assert_eq!(drive_base_url, "https://www.googleapis.com/drive/v3");
                assert_eq!(request_timeout_secs, 30);
                assert_eq!(max_attempts, 3);
            }
            _ => panic!("expected google config"),
        }
    }

    #[test]
    fn test_google_config_requires_exactly_one_token_source() {
        let none: ProviderConfig = serde_json::from_str(r#"{"type":"google"}"#).unwrap();
        assert!(none.validate().is_err());

        let both: ProviderConfig = serde_json::from_str(
            r#"{"type":"google","access_token":"a","access_token_env":"B"}"#,
        )
        .unwrap();
        assert!(both.validate().is_err());

        let one: ProviderConfig =
            serde_json::from_str(r#"{"type":"google","access_token":"a"}"#).unwrap();
        assert!(one.validate().is_ok());

        let key_file: ProviderConfig = serde_json::from_str(
            r#"{"type":"google","service_account_key_file":"/etc/sheetbase/key.json"}"#,
        )
        .unwrap();
        assert!(key_file.validate().is_ok());

        let key_and_token: ProviderConfig = serde_json::from_str(
            r#"{"type":"google","service_account_key_file":"k.json","access_token":"a"}"#,
        )
        .unwrap();
        assert!(key_and_token.validate().is_err());
    }

    #[test]
    fn test_google_config_rejects_zero_attempts() {
        let config: ProviderConfig = serde_json::from_str(
            r#"{"type":"google","access_token":"a","max_attempts":0}"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_catalog_rejects_zero_poll_interval() {
        let config = CatalogConfig {
            poll_interval_secs: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_auth_config_rejects_malformed_hash() {
        let config = AuthConfig {
            tokens: vec![IdentityTokenConfig {
                token_hash: "not-a-hash".to_string(),
                subject: "s".to_string(),
                email: None,
            }],
        };
        assert!(config.validate().is_err());
        assert!(AuthConfig::for_testing().validate().is_ok());
    }

    #[test]
    fn test_for_testing_is_valid() {
        assert!(AppConfig::for_testing().validate().is_ok());
    }
}
