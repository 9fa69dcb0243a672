//! Department rename cascade.
//!
//! Renaming a department updates its canonical record first, then rewrites
//! every dataset record and user profile that still carries the old name in
//! one batched store write. The department file in the provider keeps its
//! title.

use crate::error::{ApiError, ApiResult, Progress};
use serde::Serialize;
use sheetbase_core::validate_department_name;
use sheetbase_metadata::MetadataStore;
use sheetbase_metadata::models::{BatchWrite, DatasetFilter, DatasetPatch};
use sheetbase_metadata::repos::{DatasetRepo, DepartmentRepo, UserRepo};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

/// Result of a completed rename cascade.
#[derive(Debug, Clone, Serialize)]
pub struct RenameOutcome {
    pub department_id: Uuid,
    pub department_name: String,
    pub previous_name: String,
    pub datasets_updated: u64,
    pub users_updated: u64,
}

/// Rename a department and rewrite every record referencing the old name.
///
/// When the department already carries `new_name`, `previous_name` selects
/// the stale name to sweep; this finishes a cascade whose batched rewrite
/// failed after the rename itself succeeded.
pub async fn rename_department(
    metadata: &dyn MetadataStore,
    department_id: Uuid,
    new_name: &str,
    previous_name: Option<&str>,
) -> ApiResult<RenameOutcome> {
    validate_department_name(new_name)?;

    let department = metadata
        .get_department(department_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("department {department_id}")))?;

    let mut progress = Progress::new("rename_department");
    progress.resource("department_id", department_id.to_string());

    let old_name = if department.department_name == new_name {
        match previous_name {
            Some(previous) if previous != new_name => previous.to_string(),
            _ => {
                return Ok(RenameOutcome {
                    department_id,
                    department_name: department.department_name.clone(),
                    previous_name: department.department_name,
                    datasets_updated: 0,
                    users_updated: 0,
                });
            }
        }
    } else {
        let now = OffsetDateTime::now_utc();
        metadata
            .rename_department(department_id, new_name, now)
            .await?;
        progress.done("rename_department");
        department.department_name
    };
    progress.resource("previous_name", &old_name);

    let datasets = metadata
        .find_datasets(&DatasetFilter::by_department(&old_name))
        .await
        .map_err(|e| progress.fail("collect_references", e))?;
    let users = metadata
        .list_users_by_department(&old_name)
        .await
        .map_err(|e| progress.fail("collect_references", e))?;

    let writes: Vec<BatchWrite> = datasets
        .iter()
        .map(|d| BatchWrite::Dataset {
            dataset_id: d.dataset_id,
            patch: DatasetPatch {
                department_name: Some(new_name.to_string()),
                ..Default::default()
            },
        })
        .chain(users.iter().map(|u| BatchWrite::UserDepartment {
            uid: u.uid.clone(),
            department: new_name.to_string(),
        }))
        .collect();

    let outcome = if writes.is_empty() {
        Default::default()
    } else {
        metadata
            .apply_batch(&writes, OffsetDateTime::now_utc())
            .await
            .map_err(|e| progress.fail("rewrite_references", e))?
    };
    progress.done("rewrite_references");

    let stale_datasets = metadata
        .find_datasets(&DatasetFilter::by_department(&old_name))
        .await
        .map_err(|e| progress.fail("verify", e))?
        .len();
    let stale_users = metadata
        .list_users_by_department(&old_name)
        .await
        .map_err(|e| progress.fail("verify", e))?
        .len();
    if stale_datasets + stale_users > 0 {
        return Err(progress.fail(
            "verify",
            ApiError::Internal(format!(
                "{stale_datasets} dataset and {stale_users} user records still reference {old_name}"
            )),
        ));
    }

    info!(
        department_id = %department_id,
        from = %old_name,
        to = %new_name,
        datasets = outcome.datasets,
        users = outcome.users,
        "Renamed department"
    );

    Ok(RenameOutcome {
        department_id,
        department_name: new_name.to_string(),
        previous_name: old_name,
        datasets_updated: outcome.datasets,
        users_updated: outcome.users,
    })
}
