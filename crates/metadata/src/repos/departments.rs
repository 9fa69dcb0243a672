//! Department repository.

use crate::error::MetadataResult;
use crate::models::DepartmentRow;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for department records.
#[async_trait]
pub trait DepartmentRepo: Send + Sync {
    /// Create a new department.
    async fn create_department(&self, department: &DepartmentRow) -> MetadataResult<()>;

    /// Get a department by ID.
    async fn get_department(&self, department_id: Uuid) -> MetadataResult<Option<DepartmentRow>>;

    /// Get a department by name.
    async fn get_department_by_name(&self, name: &str) -> MetadataResult<Option<DepartmentRow>>;

    /// List all departments ordered by name.
    async fn list_departments(&self) -> MetadataResult<Vec<DepartmentRow>>;

    /// Change a department's name.
    async fn rename_department(
        &self,
        department_id: Uuid,
        new_name: &str,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<()>;
}
