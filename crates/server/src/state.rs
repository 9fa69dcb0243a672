//! Application state shared across handlers.

use crate::identity::IdentityVerifier;
use sheetbase_core::config::AppConfig;
use sheetbase_metadata::MetadataStore;
use sheetbase_provider::TabularProvider;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state.
///
/// Holds configured client handles only; no per-request data is shared.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Spreadsheet provider.
    pub provider: Arc<dyn TabularProvider>,
    /// Metadata store.
    pub metadata: Arc<dyn MetadataStore>,
    /// Bearer credential verifier.
    pub identity: Arc<dyn IdentityVerifier>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        config: AppConfig,
        provider: Arc<dyn TabularProvider>,
        metadata: Arc<dyn MetadataStore>,
        identity: Arc<dyn IdentityVerifier>,
    ) -> Self {
        if config.auth.tokens.is_empty() {
            tracing::warn!("No identity tokens configured; authenticated endpoints will reject all callers");
        }

        Self {
            config: Arc::new(config),
            provider,
            metadata,
            identity,
        }
    }

    /// Get the background reconciliation interval, if enabled.
    pub fn reconcile_poll_interval(&self) -> Option<Duration> {
        self.config.catalog.poll_interval()
    }
}
