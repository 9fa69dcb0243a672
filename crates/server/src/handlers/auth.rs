//! Login endpoint.

use crate::auth::require_auth;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Request, State};
use serde::Serialize;
use sheetbase_metadata::repos::UserRepo;
use time::OffsetDateTime;

/// User profile returned on login.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub uid: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
    pub department: Option<String>,
    /// Verified email when the identity carries one, otherwise the stored email.
    pub email: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub user: UserProfile,
}

/// POST /api/auth/login - Resolve the bearer identity to its user profile.
pub async fn login(State(state): State<AppState>, req: Request) -> ApiResult<Json<LoginResponse>> {
    let identity = require_auth(&req)?.identity.clone();

    let user = state
        .metadata
        .get_user(&identity.subject)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user record for {}", identity.subject)))?;

    tracing::info!(uid = %user.uid, role = %user.role, "User logged in");

    Ok(Json(LoginResponse {
        message: "Login successful",
        user: UserProfile {
            email: identity.email.or(user.email),
            uid: user.uid,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            department: user.department,
            created_at: user.created_at,
        },
    }))
}
