//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use sheetbase_metadata::MetadataError;
use sheetbase_provider::ProviderError;
use std::collections::BTreeMap;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Progress of a multi-step write that stopped part way.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<PartialFailure>,
}

/// State left behind by a multi-step write that failed after some steps
/// had already taken effect. Nothing is rolled back; the completed steps and
/// the resources they produced are reported so the state can be repaired.
#[derive(Clone, Debug, Serialize)]
pub struct PartialFailure {
    pub operation: &'static str,
    pub completed: Vec<&'static str>,
    pub failed: &'static str,
    pub cause: String,
    /// Identifiers of resources created or changed before the failure.
    pub resources: BTreeMap<&'static str, String>,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error(
        "{} partially failed at {} after {}: {}",
        .0.operation,
        .0.failed,
        .0.completed.join(", "),
        .0.cause
    )]
    PartialFailure(Box<PartialFailure>),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("validation error: {0}")]
    Core(#[from] sheetbase_core::Error),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation_error",
            Self::Unauthorized(_) => "unauthorized",
            Self::Parse(_) => "parse_error",
            Self::PartialFailure(_) => "partial_failure",
            Self::Internal(_) => "internal_error",
            Self::Provider(ProviderError::NotFound(_)) => "not_found",
            Self::Provider(ProviderError::AlreadyExists(_)) => "conflict",
            Self::Provider(ProviderError::Rejected { .. }) => "provider_rejected",
            Self::Provider(_) => "provider_error",
            Self::Metadata(MetadataError::NotFound(_)) => "not_found",
            Self::Metadata(MetadataError::AlreadyExists(_)) => "conflict",
            Self::Metadata(_) => "store_error",
            Self::Core(_) => "validation_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Parse(_) => StatusCode::BAD_REQUEST,
            Self::PartialFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Provider(e) => match e {
                ProviderError::NotFound(_) => StatusCode::NOT_FOUND,
                ProviderError::AlreadyExists(_) => StatusCode::CONFLICT,
                ProviderError::Rejected { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Metadata(e) => match e {
                MetadataError::NotFound(_) => StatusCode::NOT_FOUND,
                MetadataError::AlreadyExists(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Core(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        }
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
            partial: match &self {
                Self::PartialFailure(p) => Some(p.as_ref().clone()),
                _ => None,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Tracks the steps of a multi-step write so a late failure can be reported
/// as a [`PartialFailure`] instead of a plain error.
#[derive(Debug)]
pub struct Progress {
    operation: &'static str,
    completed: Vec<&'static str>,
    resources: BTreeMap<&'static str, String>,
}

impl Progress {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            completed: Vec::new(),
            resources: BTreeMap::new(),
        }
    }

    /// Record a step that took effect.
    pub fn done(&mut self, step: &'static str) {
        self.completed.push(step);
    }

    /// Record a resource identifier worth reporting on failure.
    pub fn resource(&mut self, name: &'static str, value: impl Into<String>) {
        self.resources.insert(name, value.into());
    }

    /// Convert a step failure into an error. With nothing completed the
    /// original error is returned unchanged.
    pub fn fail(&self, step: &'static str, err: impl Into<ApiError>) -> ApiError {
        let err = err.into();
        if self.completed.is_empty() {
            return err;
        }
        tracing::error!(
            operation = self.operation,
            failed = step,
            completed = ?self.completed,
            resources = ?self.resources,
            error = %err,
            "Multi-step write left partial state"
        );
        crate::metrics::record_partial_failure(self.operation);
        ApiError::PartialFailure(Box::new(PartialFailure {
            operation: self.operation,
            completed: self.completed.clone(),
            failed: step,
            cause: err.to_string(),
            resources: self.resources.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_by_kind() {
        assert_eq!(
            ApiError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Parse("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ProviderError::NotFound("tab".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(ProviderError::Http {
                status: 503,
                message: String::new()
            })
            .code(),
            "provider_error"
        );
        let rejected = ApiError::from(ProviderError::Rejected {
            status: 400,
            message: "Invalid sheet title".into(),
        });
        assert_eq!(rejected.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(rejected.code(), "provider_rejected");
        assert_eq!(
            ApiError::from(ProviderError::AlreadyExists("tab".into())).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_progress_without_completed_steps_keeps_error() {
        let progress = Progress::new("create_dataset");
        let err = progress.fail("create_file", ApiError::Validation("bad".into()));
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_progress_reports_partial_failure() {
        let mut progress = Progress::new("create_dataset");
        progress.done("create_file");
        progress.resource("sheet_id", "file-1");
        let err = progress.fail(
            "move_file",
            ProviderError::Http {
                status: 500,
                message: "boom".into(),
            },
        );
        match &err {
            ApiError::PartialFailure(p) => {
                assert_eq!(p.completed, vec!["create_file"]);
                assert_eq!(p.failed, "move_file");
                assert_eq!(p.resources["sheet_id"], "file-1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.code(), "partial_failure");
        assert!(err.to_string().contains("create_dataset partially failed at move_file"));
    }
}
