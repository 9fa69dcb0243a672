//! Dataset creation across the provider and the metadata store.
//!
//! Creation is a sequence of independent writes with no shared transaction:
//! find or create the department file, attach it to the catalog container,
//! add the tab, write the header row, persist the record. A failure after the
//! first effective write is reported as a partial failure naming what was
//! already done. Nothing is rolled back; a tab left without a record shows up
//! as a fallback descriptor on the next catalog read.

use crate::error::{ApiError, ApiResult, Progress};
use crate::metrics;
use sheetbase_core::config::CatalogConfig;
use sheetbase_core::{
    DatasetDescriptor, DescriptorSource, SyncStatus, validate_dataset_name,
    validate_department_name,
};
use sheetbase_metadata::MetadataStore;
use sheetbase_metadata::models::{DatasetRow, encode_columns};
use sheetbase_metadata::repos::DatasetRepo;
use sheetbase_provider::{A1Range, FileQuery, TabularProvider};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

/// Fields supplied by the caller for a new dataset.
#[derive(Debug, Clone)]
pub struct NewDataset {
    pub database_name: String,
    pub department_name: String,
    pub created_by: String,
    pub database_password: String,
    pub columns: Vec<String>,
}

impl NewDataset {
    fn validate(&self) -> ApiResult<()> {
        validate_dataset_name(&self.database_name)?;
        validate_department_name(&self.department_name)?;
        if self.created_by.trim().is_empty() {
            return Err(ApiError::Validation("created_by is required".to_string()));
        }
        if self.database_password.is_empty() {
            return Err(ApiError::Validation(
                "database_password is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Create a dataset tab in the department's file and persist its record.
///
/// An existing file with the department's name is reused. Concurrent calls
/// for a department that has no file yet may each create one.
pub async fn create_dataset(
    provider: &dyn TabularProvider,
    metadata: &dyn MetadataStore,
    catalog: &CatalogConfig,
    request: NewDataset,
) -> ApiResult<DatasetDescriptor> {
    request.validate()?;

    let mut progress = Progress::new("create_dataset");

    let query = FileQuery {
        container_id: catalog.container_id.clone(),
        mime_type: catalog.mime_type.clone(),
        name: Some(request.department_name.clone()),
    };
    let existing = provider.list_files(&query).await?.into_iter().next();

    let (sheet_id, sheet_url) = match existing {
        Some(entry) => {
            info!(
                sheet_id = %entry.id,
                department = %request.department_name,
                "Reusing department file"
            );
            let url = entry.web_view_link.unwrap_or_default();
            (entry.id, url)
        }
        None => {
            let created = provider.create_file(&request.department_name).await?;
            progress.done("create_file");
            progress.resource("sheet_id", &created.id);

            provider
                .move_file(&created.id, &catalog.container_id)
                .await
                .map_err(|e| progress.fail("move_file", e))?;
            progress.done("move_file");

            info!(
                sheet_id = %created.id,
                department = %request.department_name,
                "Created department file"
            );
            (created.id, created.url)
        }
    };

    provider
        .create_tab(&sheet_id, &request.database_name)
        .await
        .map_err(|e| progress.fail("create_tab", e))?;
    progress.done("create_tab");
    progress.resource("sheet_id", &sheet_id);
    progress.resource("database_name", &request.database_name);

    if !request.columns.is_empty() {
        provider
            .write_range(
                &sheet_id,
                &A1Range::origin(&request.database_name),
                std::slice::from_ref(&request.columns),
            )
            .await
            .map_err(|e| progress.fail("write_header", e))?;
        progress.done("write_header");
    }

    let now = OffsetDateTime::now_utc();
    let row = DatasetRow {
        dataset_id: Uuid::new_v4(),
        sheet_id,
        database_name: request.database_name,
        department_name: request.department_name,
        created_by: request.created_by,
        database_password: request.database_password,
        columns: encode_columns(&request.columns),
        sheet_url,
        is_active: true,
        sync_status: SyncStatus::Idle.as_str().to_string(),
        created_at: Some(now),
        updated_at: Some(now),
    };
    metadata
        .insert_dataset(&row)
        .await
        .map_err(|e| progress.fail("insert_record", e))?;

    metrics::DATASETS_CREATED.inc();
    info!(
        dataset_id = %row.dataset_id,
        sheet_id = %row.sheet_id,
        database_name = %row.database_name,
        "Created dataset"
    );

    Ok(DatasetDescriptor {
        id: row.dataset_id.to_string(),
        sheet_id: row.sheet_id,
        database_name: row.database_name,
        department_name: row.department_name,
        created_by: row.created_by,
        database_password: row.database_password,
        columns: request.columns,
        is_active: row.is_active,
        sheet_url: row.sheet_url,
        sync_status: Some(SyncStatus::Idle),
        created_at: row.created_at,
        updated_at: row.updated_at,
        source: DescriptorSource::Metadata,
    })
}
