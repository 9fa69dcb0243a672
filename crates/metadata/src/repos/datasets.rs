//! Dataset record repository.

use crate::error::MetadataResult;
use crate::models::{BatchOutcome, BatchWrite, DatasetFilter, DatasetPatch, DatasetRow};
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for dataset records.
#[async_trait]
pub trait DatasetRepo: Send + Sync {
    /// Insert a new dataset record.
    async fn insert_dataset(&self, dataset: &DatasetRow) -> MetadataResult<()>;

    /// Get a dataset record by id.
    async fn get_dataset(&self, dataset_id: Uuid) -> MetadataResult<Option<DatasetRow>>;

    /// First record matching the filter, in insertion order.
    async fn find_dataset(&self, filter: &DatasetFilter) -> MetadataResult<Option<DatasetRow>>;

    /// All records matching the filter, in insertion order.
    async fn find_datasets(&self, filter: &DatasetFilter) -> MetadataResult<Vec<DatasetRow>>;

    /// All dataset records, in insertion order.
    async fn list_datasets(&self) -> MetadataResult<Vec<DatasetRow>> {
        self.find_datasets(&DatasetFilter::default()).await
    }

    /// Apply a patch to one record and stamp `updated_at`.
    async fn update_dataset(
        &self,
        dataset_id: Uuid,
        patch: &DatasetPatch,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<()>;

    /// Apply every write in a single transaction. Either all writes land or none do.
    async fn apply_batch(
        &self,
        writes: &[BatchWrite],
        updated_at: OffsetDateTime,
    ) -> MetadataResult<BatchOutcome>;

    /// Delete a dataset record.
    async fn delete_dataset(&self, dataset_id: Uuid) -> MetadataResult<()>;
}
