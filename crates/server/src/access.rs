//! Dataset lookup, tab reads and the access gate.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use sheetbase_core::{TabRecord, rows_to_records};
use sheetbase_metadata::MetadataStore;
use sheetbase_metadata::models::{DatasetFilter, DatasetRow};
use sheetbase_metadata::repos::DatasetRepo;
use sheetbase_provider::{A1Range, TabularProvider};
use tracing::{debug, info};

/// Resolve a dataset record by sheet id, optionally narrowed by tab name.
///
/// A department file holds several tabs, so a bare sheet id is only
/// accepted when exactly one record carries it.
pub async fn resolve_dataset(
    metadata: &dyn MetadataStore,
    sheet_id: &str,
    database_name: Option<&str>,
) -> ApiResult<DatasetRow> {
    let filter =
        DatasetFilter::by_sheet(sheet_id).with_database_name(database_name.map(str::to_string));
    let mut matches = metadata.find_datasets(&filter).await?;

    match matches.len() {
        0 => Err(ApiError::NotFound(match database_name {
            Some(name) => format!("dataset {name} in sheet {sheet_id}"),
            None => format!("sheet {sheet_id}"),
        })),
        1 => Ok(matches.remove(0)),
        n => match database_name {
            None => Err(ApiError::Validation(format!(
                "sheet {sheet_id} is ambiguous: {n} datasets match, specify database_name"
            ))),
            Some(name) => {
                debug!(
                    sheet_id = %sheet_id,
                    database_name = %name,
                    matches = n,
                    "Duplicate dataset records, using first"
                );
                Ok(matches.remove(0))
            }
        },
    }
}

/// Read every row of a dataset's tab, keyed by its header row.
pub async fn get_tab_data(
    provider: &dyn TabularProvider,
    metadata: &dyn MetadataStore,
    sheet_id: &str,
    database_name: Option<&str>,
) -> ApiResult<Vec<TabRecord>> {
    let dataset = resolve_dataset(metadata, sheet_id, database_name).await?;
    let values = provider
        .read_range(&dataset.sheet_id, &A1Range::whole(&dataset.database_name))
        .await?;
    Ok(rows_to_records(values))
}

/// Compare a candidate credential with the dataset's stored password.
pub async fn confirm_access(
    metadata: &dyn MetadataStore,
    sheet_id: &str,
    database_name: Option<&str>,
    candidate: &str,
) -> ApiResult<DatasetRow> {
    let dataset = match resolve_dataset(metadata, sheet_id, database_name).await {
        Ok(dataset) => dataset,
        Err(e) => {
            if matches!(e, ApiError::NotFound(_)) {
                metrics::record_access_check("not_found");
            }
            return Err(e);
        }
    };

    // Plain equality against the stored value; passwords are not hashed at rest.
    if dataset.database_password != candidate {
        metrics::record_access_check("denied");
        info!(sheet_id = %sheet_id, database_name = %dataset.database_name, "Access denied");
        return Err(ApiError::Unauthorized("Incorrect password".to_string()));
    }

    metrics::record_access_check("granted");
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetbase_core::SyncStatus;
    use sheetbase_metadata::SqliteStore;
    use sheetbase_metadata::models::encode_columns;
    use time::OffsetDateTime;
    use uuid::Uuid;

    async fn store_with(records: &[(&str, &str, &str)]) -> (tempfile::TempDir, SqliteStore) {
        let temp = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(temp.path().join("metadata.db"), None)
            .await
            .unwrap();
        for (sheet_id, tab, password) in records {
            let now = OffsetDateTime::now_utc();
            store
                .insert_dataset(&DatasetRow {
                    dataset_id: Uuid::new_v4(),
                    sheet_id: sheet_id.to_string(),
                    database_name: tab.to_string(),
                    department_name: "HR".to_string(),
                    created_by: "alice".to_string(),
                    database_password: password.to_string(),
                    columns: encode_columns(&[]),
                    sheet_url: String::new(),
                    is_active: true,
                    sync_status: SyncStatus::Idle.as_str().to_string(),
                    created_at: Some(now),
                    updated_at: Some(now),
                })
                .await
                .unwrap();
        }
        (temp, store)
    }

    #[tokio::test]
    async fn test_unknown_sheet_is_not_found() {
        let (_temp, store) = store_with(&[]).await;
        let err = confirm_access(&store, "missing", None, "pw").await.unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let (_temp, store) = store_with(&[("s1", "Payroll", "secret")]).await;
        let err = confirm_access(&store, "s1", None, "guess").await.unwrap_err();
        assert_eq!(err.code(), "unauthorized");
        assert!(err.to_string().contains("Incorrect password"));

        let granted = confirm_access(&store, "s1", None, "secret").await.unwrap();
        assert_eq!(granted.database_name, "Payroll");
    }

    #[tokio::test]
    async fn test_ambiguous_sheet_requires_name() {
        let (_temp, store) = store_with(&[("s1", "Payroll", "a"), ("s1", "Roster", "b")]).await;

        let err = resolve_dataset(&store, "s1", None).await.unwrap_err();
        assert_eq!(err.code(), "validation_error");
        assert!(err.to_string().contains("ambiguous"));

        let roster = resolve_dataset(&store, "s1", Some("Roster")).await.unwrap();
        assert_eq!(roster.database_password, "b");

        let err = resolve_dataset(&store, "s1", Some("Missing")).await.unwrap_err();
        assert_eq!(err.code(), "not_found");
    }
}
