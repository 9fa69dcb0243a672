//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid dataset name: {0}")]
    InvalidDatasetName(String),

    #[error("invalid department name: {0}")]
    InvalidDepartmentName(String),

    #[error("invalid sync status: {0}")]
    InvalidSyncStatus(String),

    #[error("invalid columns: {0}")]
    InvalidColumns(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
