//! Shared handler helpers.

use crate::error::{ApiError, ApiResult};
use axum::extract::Request;
use serde::de::DeserializeOwned;

/// Maximum body size for small JSON control requests (1 MiB).
pub const MAX_JSON_BODY_SIZE: usize = 1024 * 1024;

/// Read and decode a JSON request body.
///
/// Missing or mistyped fields are validation errors, matching the other
/// client faults.
pub async fn read_json<T: DeserializeOwned>(req: Request, limit: usize) -> ApiResult<T> {
    let bytes = axum::body::to_bytes(req.into_body(), limit)
        .await
        .map_err(|e| ApiError::Validation(format!("failed to read body: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Validation(format!("invalid JSON: {e}")))
}

/// Reject a missing or blank required field.
pub fn required<'a>(value: Option<&'a str>, field: &str) -> ApiResult<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::Validation(format!("missing required field: {field}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        name: String,
    }

    #[tokio::test]
    async fn test_read_json_decodes_body() {
        let req = Request::builder()
            .body(Body::from(r#"{"name":"Budget"}"#))
            .unwrap();
        let payload: Payload = read_json(req, MAX_JSON_BODY_SIZE).await.unwrap();
        assert_eq!(payload.name, "Budget");
    }

    #[tokio::test]
    async fn test_read_json_rejects_malformed_body() {
        let req = Request::builder().body(Body::from("{")).unwrap();
        let err = read_json::<Payload>(req, MAX_JSON_BODY_SIZE).await.unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }

    #[tokio::test]
    async fn test_read_json_enforces_limit() {
        let req = Request::builder()
            .body(Body::from(format!(r#"{{"name":"{}"}}"#, "x".repeat(64))))
            .unwrap();
        assert!(read_json::<Payload>(req, 16).await.is_err());
    }

    #[test]
    fn test_required_rejects_blank() {
        assert!(required(Some("  "), "sheet_id").is_err());
        assert!(required(None, "sheet_id").is_err());
        assert_eq!(required(Some("s1"), "sheet_id").unwrap(), "s1");
    }
}
