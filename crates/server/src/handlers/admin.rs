//! Department administration endpoints.

use crate::auth::require_auth;
use crate::cascade::{self, RenameOutcome};
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{MAX_JSON_BODY_SIZE, read_json, required};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Request, State};
use serde::{Deserialize, Serialize};
use sheetbase_metadata::repos::DepartmentRepo;
use time::OffsetDateTime;
use uuid::Uuid;

/// Department summary.
#[derive(Debug, Serialize)]
pub struct DepartmentResponse {
    pub id: String,
    pub department_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Department list response.
#[derive(Debug, Serialize)]
pub struct ListDepartmentsResponse {
    pub departments: Vec<DepartmentResponse>,
}

/// GET /api/super-admin/departments - List departments by name.
pub async fn list_departments(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<ListDepartmentsResponse>> {
    require_auth(&req)?;

    let departments = state
        .metadata
        .list_departments()
        .await?
        .into_iter()
        .map(|d| DepartmentResponse {
            id: d.department_id.to_string(),
            department_name: d.department_name,
            created_at: d.created_at,
            updated_at: d.updated_at,
        })
        .collect();

    Ok(Json(ListDepartmentsResponse { departments }))
}

/// Rename department request.
#[derive(Debug, Deserialize)]
pub struct RenameDepartmentRequest {
    pub department_name: Option<String>,
    /// Stale name to sweep when the department already carries the new name.
    pub previous_name: Option<String>,
}

/// Rename department response.
#[derive(Debug, Serialize)]
pub struct RenameDepartmentResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub outcome: RenameOutcome,
}

/// PUT /api/super-admin/department/{id} - Rename a department and cascade
/// the new name to dataset records and user profiles.
pub async fn rename_department(
    State(state): State<AppState>,
    Path(department_id): Path<String>,
    req: Request,
) -> ApiResult<Json<RenameDepartmentResponse>> {
    let auth = require_auth(&req)?.clone();

    let department_id = Uuid::parse_str(&department_id)
        .map_err(|_| ApiError::Validation(format!("invalid department id: {department_id}")))?;

    let body: RenameDepartmentRequest = read_json(req, MAX_JSON_BODY_SIZE).await?;
    let new_name = required(body.department_name.as_deref(), "department_name")?;

    tracing::info!(
        subject = %auth.identity.subject,
        department_id = %department_id,
        "Department rename requested"
    );

    let outcome = cascade::rename_department(
        state.metadata.as_ref(),
        department_id,
        new_name,
        body.previous_name.as_deref(),
    )
    .await?;

    Ok(Json(RenameDepartmentResponse {
        message: "Department updated successfully",
        outcome,
    }))
}
