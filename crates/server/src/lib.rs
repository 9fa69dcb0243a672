//! HTTP API server for spreadsheet-backed datasets.
//!
//! This crate provides:
//! - Dataset catalog reconciliation between provider tabs and metadata records
//! - Dataset creation across both stores
//! - Row and CSV ingestion
//! - Tab reads and the dataset access gate
//! - Department rename cascade
//! - Identity middleware, metrics and the `sheetbased` binary

pub mod access;
pub mod auth;
pub mod cascade;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod ingest;
pub mod metrics;
pub mod poll;
pub mod provision;
pub mod reconcile;
pub mod routes;
pub mod state;

pub use auth::TraceId;
pub use error::ApiError;
pub use identity::{Identity, IdentityVerifier, StaticTokenVerifier};
pub use routes::create_router;
pub use state::AppState;
