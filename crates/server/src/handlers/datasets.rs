//! Dataset catalog, ingestion and read endpoints.

use crate::access;
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{MAX_JSON_BODY_SIZE, read_json, required};
use crate::ingest;
use crate::metrics;
use crate::provision::{self, NewDataset};
use crate::reconcile;
use crate::state::AppState;
use axum::Json;
use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheetbase_core::{DatasetDescriptor, TabRecord, TabularRow};
use tracing::debug;

/// Dataset catalog response.
#[derive(Debug, Serialize)]
pub struct ListDatasetsResponse {
    pub sheets: Vec<DatasetDescriptor>,
}

/// GET /api/database/databases - Reconciled dataset catalog.
pub async fn list_datasets(
    State(state): State<AppState>,
) -> ApiResult<Json<ListDatasetsResponse>> {
    let result = reconcile::list_datasets(
        state.provider.as_ref(),
        state.metadata.as_ref(),
        &state.config.catalog,
    )
    .await?;
    metrics::record_catalog_served(result.descriptors.len(), result.fallback_count());

    Ok(Json(ListDatasetsResponse {
        sheets: result.descriptors,
    }))
}

/// Create dataset request.
#[derive(Debug, Deserialize)]
pub struct CreateDatasetRequest {
    pub database_name: Option<String>,
    pub department_name: Option<String>,
    pub database_password: Option<String>,
    pub created_by: Option<String>,
    #[serde(default)]
    pub columns: Vec<String>,
}

/// Create dataset response.
#[derive(Debug, Serialize)]
pub struct CreateDatasetResponse {
    pub message: &'static str,
    pub id: String,
    pub sheet_id: String,
    pub sheet_url: String,
    pub database_name: String,
}

/// POST /api/database/databases - Create a dataset tab and its record.
pub async fn create_dataset(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<CreateDatasetResponse>)> {
    let body: CreateDatasetRequest = read_json(req, MAX_JSON_BODY_SIZE).await?;

    let request = NewDataset {
        database_name: required(body.database_name.as_deref(), "database_name")?.to_string(),
        department_name: required(body.department_name.as_deref(), "department_name")?
            .to_string(),
        database_password: required(body.database_password.as_deref(), "database_password")?
            .to_string(),
        created_by: required(body.created_by.as_deref(), "created_by")?.to_string(),
        columns: body.columns,
    };

    let descriptor = provision::create_dataset(
        state.provider.as_ref(),
        state.metadata.as_ref(),
        &state.config.catalog,
        request,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateDatasetResponse {
            message: "Database sheet created successfully",
            id: descriptor.id,
            sheet_id: descriptor.sheet_id,
            sheet_url: descriptor.sheet_url,
            database_name: descriptor.database_name,
        }),
    ))
}

/// Append rows request. Cells may be strings, numbers, booleans or null.
#[derive(Debug, Deserialize)]
pub struct AppendRowsRequest {
    pub sheet_id: Option<String>,
    pub database_name: Option<String>,
    pub rows: Option<Vec<Vec<Value>>>,
}

/// Append response.
#[derive(Debug, Serialize)]
pub struct AppendResponse {
    pub message: &'static str,
    pub rows_appended: u64,
}

fn cell_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// POST /api/database/append-rows - Append a batch of rows to a tab.
pub async fn append_rows(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<AppendResponse>> {
    let limit = state.config.server.max_upload_bytes;
    let body: AppendRowsRequest = read_json(req, limit).await?;

    let sheet_id = required(body.sheet_id.as_deref(), "sheet_id")?;
    let tab = required(body.database_name.as_deref(), "database_name")?;
    let rows: Vec<TabularRow> = body
        .rows
        .unwrap_or_default()
        .into_iter()
        .map(|row| row.into_iter().map(cell_text).collect())
        .collect();

    let appended = ingest::append_rows(state.provider.as_ref(), sheet_id, tab, &rows).await?;

    Ok(Json(AppendResponse {
        message: "Rows appended successfully",
        rows_appended: appended,
    }))
}

/// Whether a multipart file part looks like CSV.
fn is_csv_part(content_type: Option<&str>, file_name: Option<&str>) -> bool {
    let csv_type = content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|ct| ct.trim().eq_ignore_ascii_case("text/csv"));
    let csv_name = file_name.is_some_and(|name| name.to_ascii_lowercase().ends_with(".csv"));
    csv_type || csv_name
}

fn multipart_error(e: impl std::fmt::Display) -> ApiError {
    ApiError::Validation(format!("invalid multipart body: {e}"))
}

/// POST /api/database/upload-csv - Parse an uploaded CSV file and append its rows.
///
/// Expects multipart fields `sheet_id`, `database_name` and a `file` part.
pub async fn upload_csv(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<AppendResponse>> {
    let mut multipart = Multipart::from_request(req, &state)
        .await
        .map_err(multipart_error)?;

    let mut sheet_id = None;
    let mut database_name = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "sheet_id" => sheet_id = Some(field.text().await.map_err(multipart_error)?),
            "database_name" => {
                database_name = Some(field.text().await.map_err(multipart_error)?)
            }
            "file" => {
                if !is_csv_part(field.content_type(), field.file_name()) {
                    crate::metrics::record_ingestion_failure("not_csv");
                    return Err(ApiError::Validation(
                        "Only CSV files are allowed".to_string(),
                    ));
                }
                file = Some(field.bytes().await.map_err(multipart_error)?);
            }
            other => debug!(field = %other, "Ignoring multipart field"),
        }
    }

    let sheet_id = required(sheet_id.as_deref(), "sheet_id")?;
    let tab = required(database_name.as_deref(), "database_name")?;
    let data =
        file.ok_or_else(|| ApiError::Validation("missing required field: file".to_string()))?;

    let appended = ingest::ingest_csv(state.provider.as_ref(), sheet_id, tab, &data).await?;

    Ok(Json(AppendResponse {
        message: "CSV rows appended successfully",
        rows_appended: appended,
    }))
}

/// Access check request.
#[derive(Debug, Deserialize)]
pub struct ConfirmPasswordRequest {
    pub sheet_id: Option<String>,
    pub input_password: Option<String>,
    pub database_name: Option<String>,
}

/// Access check response.
#[derive(Debug, Serialize)]
pub struct ConfirmPasswordResponse {
    pub message: &'static str,
}

/// POST /api/database/confirm-password - Check a dataset credential.
pub async fn confirm_password(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<ConfirmPasswordResponse>> {
    let body: ConfirmPasswordRequest = read_json(req, MAX_JSON_BODY_SIZE).await?;

    let (Some(sheet_id), Some(candidate)) =
        (body.sheet_id.as_deref(), body.input_password.as_deref())
    else {
        return Err(ApiError::Validation(
            "Missing sheet_id or input_password".to_string(),
        ));
    };

    access::confirm_access(
        state.metadata.as_ref(),
        sheet_id,
        body.database_name.as_deref(),
        candidate,
    )
    .await?;

    Ok(Json(ConfirmPasswordResponse {
        message: "Access granted",
    }))
}

/// Optional tab selector for sheets holding several datasets.
#[derive(Debug, Default, Deserialize)]
pub struct TabQuery {
    pub database_name: Option<String>,
}

/// GET /api/database/{sheet_id} - Read a dataset's rows keyed by header.
pub async fn get_tab_data(
    State(state): State<AppState>,
    Path(sheet_id): Path<String>,
    Query(query): Query<TabQuery>,
) -> ApiResult<Json<Vec<TabRecord>>> {
    let records = access::get_tab_data(
        state.provider.as_ref(),
        state.metadata.as_ref(),
        &sheet_id,
        query.database_name.as_deref(),
    )
    .await?;
    Ok(Json(records))
}
