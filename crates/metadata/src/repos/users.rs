//! User profile repository.

use crate::error::MetadataResult;
use crate::models::UserRow;
use async_trait::async_trait;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create_user(&self, user: &UserRow) -> MetadataResult<()>;

    async fn get_user(&self, uid: &str) -> MetadataResult<Option<UserRow>>;

    /// Users whose department field equals `department`.
    async fn list_users_by_department(&self, department: &str) -> MetadataResult<Vec<UserRow>>;
}
