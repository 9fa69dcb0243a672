//! Database models mapping to the metadata schema.

use crate::error::{MetadataError, MetadataResult};
use sheetbase_core::SyncStatus;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Datasets
// =============================================================================

/// Dataset record: the persisted facts about one spreadsheet tab.
///
/// `(sheet_id, database_name)` is the join key against the provider listing.
/// It is indexed but not unique; readers take the earliest record when
/// duplicates exist.
#[derive(Debug, Clone, FromRow)]
pub struct DatasetRow {
    pub dataset_id: Uuid,
    pub sheet_id: String,
    pub database_name: String,
    pub department_name: String,
    pub created_by: String,
    pub database_password: String,
    /// JSON array of column names.
    pub columns: String,
    pub sheet_url: String,
    pub is_active: bool,
    pub sync_status: String,
    pub created_at: Option<OffsetDateTime>,
    pub updated_at: Option<OffsetDateTime>,
}

impl DatasetRow {
    /// Decode the stored column list.
    pub fn column_names(&self) -> MetadataResult<Vec<String>> {
        serde_json::from_str(&self.columns).map_err(|e| {
            MetadataError::Corrupt(format!("dataset {} columns: {e}", self.dataset_id))
        })
    }

    /// Decode the stored sync status.
    pub fn status(&self) -> MetadataResult<SyncStatus> {
        SyncStatus::parse(&self.sync_status)
            .map_err(|e| MetadataError::Corrupt(format!("dataset {}: {e}", self.dataset_id)))
    }
}

/// Encode a column list for storage.
pub fn encode_columns(columns: &[String]) -> String {
    // Serializing a slice of strings cannot fail.
    serde_json::to_string(columns).unwrap_or_else(|_| "[]".to_string())
}

/// Filter for dataset lookups. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct DatasetFilter {
    pub sheet_id: Option<String>,
    pub database_name: Option<String>,
    pub department_name: Option<String>,
}

impl DatasetFilter {
    pub fn by_sheet(sheet_id: impl Into<String>) -> Self {
        Self {
            sheet_id: Some(sheet_id.into()),
            ..Default::default()
        }
    }

    pub fn by_department(department_name: impl Into<String>) -> Self {
        Self {
            department_name: Some(department_name.into()),
            ..Default::default()
        }
    }

    pub fn with_database_name(mut self, database_name: Option<String>) -> Self {
        self.database_name = database_name;
        self
    }
}

/// Partial update for a dataset record. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct DatasetPatch {
    pub database_name: Option<String>,
    pub department_name: Option<String>,
    pub database_password: Option<String>,
    pub columns: Option<Vec<String>>,
    pub sheet_url: Option<String>,
    pub is_active: Option<bool>,
    pub sync_status: Option<SyncStatus>,
}

// =============================================================================
// Departments
// =============================================================================

/// Department record.
#[derive(Debug, Clone, FromRow)]
pub struct DepartmentRow {
    pub department_id: Uuid,
    pub department_name: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

// =============================================================================
// Users
// =============================================================================

/// User profile keyed by the identity provider's subject.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub uid: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
    pub department: Option<String>,
    pub email: Option<String>,
    pub created_at: OffsetDateTime,
}

// =============================================================================
// Batched writes
// =============================================================================

/// One write inside an atomic batch.
#[derive(Debug, Clone)]
pub enum BatchWrite {
    /// Patch a dataset record.
    Dataset { dataset_id: Uuid, patch: DatasetPatch },
    /// Move a user to another department.
    UserDepartment { uid: String, department: String },
}

/// Counts of records touched by an applied batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub datasets: u64,
    pub users: u64,
}
