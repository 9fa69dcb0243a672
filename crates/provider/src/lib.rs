//! Tabular provider abstraction and backends for sheetbase.
//!
//! This crate provides:
//! - The `TabularProvider` trait over folders, spreadsheet files, tabs and cell ranges
//! - A1 range notation helpers
//! - A per-call timeout and bounded retry policy
//! - Access tokens: fixed, or minted from a service account key
//! - Backends: in-memory and Google Drive/Sheets

pub mod backends;
pub mod credentials;
pub mod error;
pub mod range;
pub mod retry;
pub mod traits;

pub use backends::{google::GoogleProvider, memory::MemoryProvider};
pub use credentials::{ServiceAccountKey, ServiceAccountTokens, StaticToken, TokenSource};
pub use error::{ProviderError, ProviderResult};
pub use range::{A1Range, CellRef};
pub use retry::RetryPolicy;
pub use traits::{CreatedFile, FileEntry, FileQuery, ProviderFile, TabularProvider};

use sheetbase_core::config::ProviderConfig;
use std::sync::Arc;
use std::time::Duration;

/// Create a tabular provider from configuration.
pub fn from_config(config: &ProviderConfig) -> ProviderResult<Arc<dyn TabularProvider>> {
    config.validate().map_err(ProviderError::Config)?;

    match config {
        ProviderConfig::Memory => {
            tracing::warn!("Using in-memory provider; spreadsheet contents are lost on restart");
            Ok(Arc::new(MemoryProvider::new()))
        }
        ProviderConfig::Google {
            drive_base_url,
            sheets_base_url,
            service_account_key_file,
            access_token,
            access_token_env,
            request_timeout_secs,
            max_attempts,
            retry_base_delay_ms,
        } => {
            let policy = RetryPolicy {
                timeout: Duration::from_secs(*request_timeout_secs),
                max_attempts: *max_attempts,
                base_delay: Duration::from_millis(*retry_base_delay_ms),
            };
            let tokens: Arc<dyn TokenSource> =
                match (service_account_key_file, access_token, access_token_env) {
                    (Some(path), _, _) => {
                        let key = ServiceAccountKey::from_file(path)?;
                        tracing::info!(
                            client_email = %key.client_email,
                            "Using service account credentials"
                        );
                        Arc::new(ServiceAccountTokens::new(key, policy)?)
                    }
                    (None, Some(token), _) => {
                        tracing::warn!("Using a fixed access token; it will not be refreshed");
                        Arc::new(StaticToken::new(token.clone())?)
                    }
                    (None, None, Some(var)) => {
                        let token = std::env::var(var).map_err(|_| {
                            ProviderError::Config(format!("environment variable {var} is not set"))
                        })?;
                        tracing::warn!("Using a fixed access token; it will not be refreshed");
                        Arc::new(StaticToken::new(token)?)
                    }
                    (None, None, None) => {
                        return Err(ProviderError::Config(
                            "google provider requires credentials".to_string(),
                        ));
                    }
                };
            let backend = GoogleProvider::new(drive_base_url, sheets_base_url, tokens, policy)?;
            Ok(Arc::new(backend))
        }
    }
}
