//! Test fixtures for seeding records and building payloads.

use serde_json::{Value, json};
use sheetbase_core::SyncStatus;
use sheetbase_metadata::MetadataStore;
use sheetbase_metadata::models::{DatasetRow, DepartmentRow, UserRow, encode_columns};
use sheetbase_metadata::repos::{DatasetRepo, DepartmentRepo, UserRepo};
use time::OffsetDateTime;
use uuid::Uuid;

/// Bearer token accepted by `AuthConfig::for_testing`.
#[allow(dead_code)]
pub const TEST_TOKEN: &str = "test-identity-token";

/// Subject the test token resolves to.
#[allow(dead_code)]
pub const TEST_SUBJECT: &str = "test-subject";

/// JSON body for the create-dataset endpoint.
#[allow(dead_code)]
pub fn create_dataset_body(name: &str, department: &str, columns: &[&str]) -> Value {
    json!({
        "database_name": name,
        "department_name": department,
        "database_password": "pw1",
        "created_by": "alice",
        "columns": columns,
    })
}

/// Insert a dataset record directly into the metadata store.
#[allow(dead_code)]
pub async fn seed_dataset(
    metadata: &dyn MetadataStore,
    sheet_id: &str,
    tab: &str,
    department: &str,
    password: &str,
) -> DatasetRow {
    let now = OffsetDateTime::now_utc();
    let row = DatasetRow {
        dataset_id: Uuid::new_v4(),
        sheet_id: sheet_id.to_string(),
        database_name: tab.to_string(),
        department_name: department.to_string(),
        created_by: "alice".to_string(),
        database_password: password.to_string(),
        columns: encode_columns(&[]),
        sheet_url: String::new(),
        is_active: true,
        sync_status: SyncStatus::Idle.as_str().to_string(),
        created_at: Some(now),
        updated_at: Some(now),
    };
    metadata
        .insert_dataset(&row)
        .await
        .expect("Failed to seed dataset");
    row
}

/// Insert a department record.
#[allow(dead_code)]
pub async fn seed_department(metadata: &dyn MetadataStore, name: &str) -> Uuid {
    let now = OffsetDateTime::now_utc();
    let id = Uuid::new_v4();
    metadata
        .create_department(&DepartmentRow {
            department_id: id,
            department_name: name.to_string(),
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("Failed to seed department");
    id
}

/// Insert a user profile.
#[allow(dead_code)]
pub async fn seed_user(
    metadata: &dyn MetadataStore,
    uid: &str,
    department: Option<&str>,
    email: Option<&str>,
) {
    metadata
        .create_user(&UserRow {
            uid: uid.to_string(),
            username: format!("{uid}-name"),
            first_name: Some("Test".to_string()),
            last_name: Some("User".to_string()),
            role: "admin".to_string(),
            department: department.map(str::to_string),
            email: email.map(str::to_string),
            created_at: OffsetDateTime::now_utc(),
        })
        .await
        .expect("Failed to seed user");
}
