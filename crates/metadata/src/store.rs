//! Metadata store trait and implementations.

use crate::error::{MetadataError, MetadataResult};
use crate::repos::{DatasetRepo, DepartmentRepo, UserRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: DatasetRepo + DepartmentRepo + UserRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store.
    ///
    /// `query_timeout_secs` bounds how long a call waits for a connection or a
    /// database lock. SQLite cannot cancel a statement once it is running.
    pub async fn new(
        path: impl AsRef<Path>,
        query_timeout_secs: Option<u64>,
    ) -> MetadataResult<Self> {
        let path = path.as_ref();
        let timeout = Duration::from_secs(query_timeout_secs.unwrap_or(30));

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(timeout);

        let pool = SqlitePoolOptions::new()
            // A single connection avoids "database is locked" failures under axum concurrency.
            .max_connections(1)
            .acquire_timeout(timeout)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        tracing::debug!(
            path = %path.display(),
            timeout_secs = timeout.as_secs(),
            "Opened SQLite metadata store"
        );

        Ok(store)
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

// Implement all the repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use crate::models::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    /// Apply a dataset patch through any executor (pool or transaction).
    /// Returns the number of rows touched.
    async fn patch_dataset<'e, E>(
        executor: E,
        dataset_id: Uuid,
        patch: &DatasetPatch,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<u64>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE datasets SET
                database_name = COALESCE(?, database_name),
                department_name = COALESCE(?, department_name),
                database_password = COALESCE(?, database_password),
                columns = COALESCE(?, columns),
                sheet_url = COALESCE(?, sheet_url),
                is_active = COALESCE(?, is_active),
                sync_status = COALESCE(?, sync_status),
                updated_at = ?
            WHERE dataset_id = ?
            "#,
        )
        .bind(patch.database_name.as_deref())
        .bind(patch.department_name.as_deref())
        .bind(patch.database_password.as_deref())
        .bind(patch.columns.as_deref().map(encode_columns))
        .bind(patch.sheet_url.as_deref())
        .bind(patch.is_active)
        .bind(patch.sync_status.map(|s| s.as_str()))
        .bind(updated_at)
        .bind(dataset_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    #[async_trait]
    impl DatasetRepo for SqliteStore {
        async fn insert_dataset(&self, dataset: &DatasetRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO datasets (
                    dataset_id, sheet_id, database_name, department_name, created_by,
                    database_password, columns, sheet_url, is_active, sync_status,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(dataset.dataset_id)
            .bind(&dataset.sheet_id)
            .bind(&dataset.database_name)
            .bind(&dataset.department_name)
            .bind(&dataset.created_by)
            .bind(&dataset.database_password)
            .bind(&dataset.columns)
            .bind(&dataset.sheet_url)
            .bind(dataset.is_active)
            .bind(&dataset.sync_status)
            .bind(dataset.created_at)
            .bind(dataset.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    MetadataError::AlreadyExists(format!("dataset {}", dataset.dataset_id))
                } else {
                    e.into()
                }
            })?;
            Ok(())
        }

        async fn get_dataset(&self, dataset_id: Uuid) -> MetadataResult<Option<DatasetRow>> {
            let row =
                sqlx::query_as::<_, DatasetRow>("SELECT * FROM datasets WHERE dataset_id = ?")
                    .bind(dataset_id)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row)
        }

        async fn find_dataset(
            &self,
            filter: &DatasetFilter,
        ) -> MetadataResult<Option<DatasetRow>> {
            Ok(self.find_datasets(filter).await?.into_iter().next())
        }

        async fn find_datasets(&self, filter: &DatasetFilter) -> MetadataResult<Vec<DatasetRow>> {
            let rows = sqlx::query_as::<_, DatasetRow>(
                r#"
                SELECT * FROM datasets
                WHERE (?1 IS NULL OR sheet_id = ?1)
                  AND (?2 IS NULL OR database_name = ?2)
                  AND (?3 IS NULL OR department_name = ?3)
                ORDER BY rowid
                "#,
            )
            .bind(filter.sheet_id.as_deref())
            .bind(filter.database_name.as_deref())
            .bind(filter.department_name.as_deref())
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn update_dataset(
            &self,
            dataset_id: Uuid,
            patch: &DatasetPatch,
            updated_at: OffsetDateTime,
        ) -> MetadataResult<()> {
            let affected = patch_dataset(&self.pool, dataset_id, patch, updated_at).await?;
            if affected == 0 {
                return Err(MetadataError::NotFound(format!("dataset {dataset_id}")));
            }
            Ok(())
        }

        async fn apply_batch(
            &self,
            writes: &[BatchWrite],
            updated_at: OffsetDateTime,
        ) -> MetadataResult<BatchOutcome> {
            let mut outcome = BatchOutcome::default();
            let mut tx = self.pool.begin().await?;

            for write in writes {
                match write {
                    BatchWrite::Dataset { dataset_id, patch } => {
                        let affected =
                            patch_dataset(&mut *tx, *dataset_id, patch, updated_at).await?;
                        if affected == 0 {
                            // Dropping the transaction rolls back earlier writes.
                            return Err(MetadataError::NotFound(format!("dataset {dataset_id}")));
                        }
                        outcome.datasets += affected;
                    }
                    BatchWrite::UserDepartment { uid, department } => {
                        let affected = sqlx::query("UPDATE users SET department = ? WHERE uid = ?")
                            .bind(department)
                            .bind(uid)
                            .execute(&mut *tx)
                            .await?
                            .rows_affected();
                        if affected == 0 {
                            return Err(MetadataError::NotFound(format!("user {uid}")));
                        }
                        outcome.users += affected;
                    }
                }
            }

            tx.commit().await?;
            Ok(outcome)
        }

        async fn delete_dataset(&self, dataset_id: Uuid) -> MetadataResult<()> {
            let result = sqlx::query("DELETE FROM datasets WHERE dataset_id = ?")
                .bind(dataset_id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!("dataset {dataset_id}")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl DepartmentRepo for SqliteStore {
        async fn create_department(&self, department: &DepartmentRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO departments (department_id, department_name, created_at, updated_at)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(department.department_id)
            .bind(&department.department_name)
            .bind(department.created_at)
            .bind(department.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    MetadataError::AlreadyExists(format!(
                        "department {}",
                        department.department_name
                    ))
                } else {
                    e.into()
                }
            })?;
            Ok(())
        }

        async fn get_department(
            &self,
            department_id: Uuid,
        ) -> MetadataResult<Option<DepartmentRow>> {
            let row = sqlx::query_as::<_, DepartmentRow>(
                "SELECT * FROM departments WHERE department_id = ?",
            )
            .bind(department_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn get_department_by_name(
            &self,
            name: &str,
        ) -> MetadataResult<Option<DepartmentRow>> {
            let row = sqlx::query_as::<_, DepartmentRow>(
                "SELECT * FROM departments WHERE department_name = ?",
            )
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn list_departments(&self) -> MetadataResult<Vec<DepartmentRow>> {
            let rows = sqlx::query_as::<_, DepartmentRow>(
                "SELECT * FROM departments ORDER BY department_name",
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn rename_department(
            &self,
            department_id: Uuid,
            new_name: &str,
            updated_at: OffsetDateTime,
        ) -> MetadataResult<()> {
            let result = sqlx::query(
                "UPDATE departments SET department_name = ?, updated_at = ? WHERE department_id = ?",
            )
            .bind(new_name)
            .bind(updated_at)
            .bind(department_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    MetadataError::AlreadyExists(format!("department {new_name}"))
                } else {
                    e.into()
                }
            })?;

            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!(
                    "department {department_id}"
                )));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl UserRepo for SqliteStore {
        async fn create_user(&self, user: &UserRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO users (
                    uid, username, first_name, last_name, role, department, email, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&user.uid)
            .bind(&user.username)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.role)
            .bind(&user.department)
            .bind(&user.email)
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    MetadataError::AlreadyExists(format!("user {}", user.uid))
                } else {
                    e.into()
                }
            })?;
            Ok(())
        }

        async fn get_user(&self, uid: &str) -> MetadataResult<Option<UserRow>> {
            let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE uid = ?")
                .bind(uid)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn list_users_by_department(&self, department: &str) -> MetadataResult<Vec<UserRow>> {
            let rows = sqlx::query_as::<_, UserRow>(
                "SELECT * FROM users WHERE department = ? ORDER BY uid",
            )
            .bind(department)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }
    }
}

impl std::convert::From<std::io::Error> for crate::MetadataError {
    fn from(e: std::io::Error) -> Self {
        crate::MetadataError::Config(e.to_string())
    }
}

/// SQL schema for SQLite.
const SCHEMA_SQL: &str = r#"
-- Dataset records; (sheet_id, database_name) joins against provider tabs
CREATE TABLE IF NOT EXISTS datasets (
    dataset_id BLOB PRIMARY KEY,
    sheet_id TEXT NOT NULL,
    database_name TEXT NOT NULL,
    department_name TEXT NOT NULL,
    created_by TEXT NOT NULL DEFAULT '',
    database_password TEXT NOT NULL DEFAULT '',
    columns TEXT NOT NULL DEFAULT '[]',
    sheet_url TEXT NOT NULL DEFAULT '',
    is_active INTEGER NOT NULL DEFAULT 1,
    sync_status TEXT NOT NULL DEFAULT 'idle',
    created_at TEXT,
    updated_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_datasets_key ON datasets(sheet_id, database_name);
CREATE INDEX IF NOT EXISTS idx_datasets_department ON datasets(department_name);

-- Departments
CREATE TABLE IF NOT EXISTS departments (
    department_id BLOB PRIMARY KEY,
    department_name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- User profiles keyed by identity subject
CREATE TABLE IF NOT EXISTS users (
    uid TEXT PRIMARY KEY,
    username TEXT NOT NULL,
    first_name TEXT,
    last_name TEXT,
    role TEXT NOT NULL,
    department TEXT,
    email TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_department ON users(department);
"#;
