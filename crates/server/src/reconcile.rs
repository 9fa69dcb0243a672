//! Metadata and tab reconciliation.
//!
//! The provider and the metadata store are written independently, so the
//! dataset catalog is recomputed on every read as a join of the live
//! `(file, tab)` pairs against the persisted records. Nothing here writes:
//! a tab with no record is presented through a synthesized fallback
//! descriptor, and a record with no tab is reported as orphaned.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use futures::future::try_join_all;
use sheetbase_core::config::CatalogConfig;
use sheetbase_core::{DatasetDescriptor, DatasetKey, DescriptorSource, fallback_dataset_id};
use sheetbase_metadata::MetadataStore;
use sheetbase_metadata::models::DatasetRow;
use sheetbase_metadata::repos::DatasetRepo;
use sheetbase_provider::{FileQuery, ProviderFile, TabularProvider};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::{debug, warn};

/// Result of joining provider tabs with metadata records.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// One descriptor per live `(file, tab)` pair, in file then tab order.
    pub descriptors: Vec<DatasetDescriptor>,
    /// Records whose key matched no live tab.
    pub orphaned: Vec<DatasetKey>,
}

impl Reconciliation {
    pub fn fallback_count(&self) -> usize {
        self.descriptors.iter().filter(|d| d.is_fallback()).count()
    }
}

/// Join provider files with metadata records.
///
/// Pure and deterministic: the same inputs always produce the same output.
/// When two records share a key the first one (store order) is used.
pub fn reconcile(files: &[ProviderFile], records: &[DatasetRow]) -> ApiResult<Reconciliation> {
    let mut index: HashMap<DatasetKey, &DatasetRow> = HashMap::with_capacity(records.len());
    for record in records {
        let key = DatasetKey::new(&record.sheet_id, &record.database_name);
        if let Some(existing) = index.get(&key) {
            warn!(
                key = %key,
                kept = %existing.dataset_id,
                ignored = %record.dataset_id,
                "Duplicate metadata record for dataset"
            );
            continue;
        }
        index.insert(key, record);
    }

    let mut seen_files = HashSet::new();
    let mut matched = HashSet::new();
    let mut descriptors = Vec::new();

    for file in files {
        if !seen_files.insert(file.id.as_str()) {
            debug!(sheet_id = %file.id, "Skipping repeated file in listing");
            continue;
        }
        let mut seen_tabs = HashSet::new();
        for tab in &file.tabs {
            if !seen_tabs.insert(tab.as_str()) {
                continue;
            }
            let key = DatasetKey::new(&file.id, tab);
            let descriptor = match index.get(&key) {
                Some(record) => {
                    let descriptor = from_record(file, record)?;
                    matched.insert(key);
                    descriptor
                }
                None => fallback(file, tab),
            };
            descriptors.push(descriptor);
        }
    }

    let mut orphaned: Vec<DatasetKey> = index
        .into_keys()
        .filter(|key| !matched.contains(key))
        .collect();
    orphaned.sort();

    Ok(Reconciliation {
        descriptors,
        orphaned,
    })
}

fn from_record(file: &ProviderFile, record: &DatasetRow) -> ApiResult<DatasetDescriptor> {
    Ok(DatasetDescriptor {
        id: record.dataset_id.to_string(),
        sheet_id: record.sheet_id.clone(),
        database_name: record.database_name.clone(),
        department_name: record.department_name.clone(),
        created_by: record.created_by.clone(),
        database_password: record.database_password.clone(),
        columns: record.column_names()?,
        is_active: record.is_active,
        sheet_url: file
            .web_view_link
            .clone()
            .unwrap_or_else(|| record.sheet_url.clone()),
        sync_status: Some(record.status()?),
        created_at: record.created_at.or(file.created_time),
        updated_at: record.updated_at.or(file.modified_time),
        source: DescriptorSource::Metadata,
    })
}

fn fallback(file: &ProviderFile, tab: &str) -> DatasetDescriptor {
    DatasetDescriptor {
        id: fallback_dataset_id(&file.id, tab),
        sheet_id: file.id.clone(),
        database_name: tab.to_string(),
        department_name: file.name.clone(),
        created_by: String::new(),
        database_password: String::new(),
        columns: Vec::new(),
        is_active: true,
        sheet_url: file.web_view_link.clone().unwrap_or_default(),
        sync_status: None,
        created_at: file.created_time,
        updated_at: file.modified_time,
        source: DescriptorSource::Fallback,
    }
}

/// Fetch both sources and reconcile them.
///
/// Any provider or store failure aborts the whole call; a partial catalog is
/// never returned. Only the duration and the orphan gauge are recorded here;
/// callers serving the catalog record what they return.
pub async fn list_datasets(
    provider: &dyn TabularProvider,
    metadata: &dyn MetadataStore,
    catalog: &CatalogConfig,
) -> ApiResult<Reconciliation> {
    let start = Instant::now();

    let query = FileQuery {
        container_id: catalog.container_id.clone(),
        mime_type: catalog.mime_type.clone(),
        name: None,
    };
    let entries = provider.list_files(&query).await?;

    // One tab listing per file; try_join_all keeps the input order.
    let files = try_join_all(entries.into_iter().map(|entry| async move {
        let tabs = provider.list_tabs(&entry.id).await?;
        Ok::<_, ApiError>(ProviderFile::new(entry, tabs))
    }))
    .await?;

    let records = metadata.list_datasets().await?;
    let result = reconcile(&files, &records)?;

    metrics::RECONCILE_DURATION.observe(start.elapsed().as_secs_f64());
    metrics::ORPHANED_RECORDS.set(result.orphaned.len() as i64);

    debug!(
        files = files.len(),
        records = records.len(),
        descriptors = result.descriptors.len(),
        "Reconciled dataset catalog"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetbase_core::SyncStatus;
    use sheetbase_metadata::models::encode_columns;
    use time::macros::datetime;
    use uuid::Uuid;

    fn file(id: &str, name: &str, tabs: &[&str]) -> ProviderFile {
        ProviderFile {
            id: id.to_string(),
            name: name.to_string(),
            created_time: Some(datetime!(2024-03-01 09:00:00 UTC)),
            modified_time: Some(datetime!(2024-03-02 09:00:00 UTC)),
            web_view_link: Some(format!("https://sheets.example/{id}")),
            tabs: tabs.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn record(sheet_id: &str, tab: &str, department: &str) -> DatasetRow {
        DatasetRow {
            dataset_id: Uuid::new_v4(),
            sheet_id: sheet_id.to_string(),
            database_name: tab.to_string(),
            department_name: department.to_string(),
            created_by: "alice".to_string(),
            database_password: "pw1".to_string(),
            columns: encode_columns(&["Name".to_string(), "Salary".to_string()]),
            sheet_url: String::new(),
            is_active: true,
            sync_status: SyncStatus::Idle.as_str().to_string(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_mixed_metadata_and_fallback() {
        let files = vec![file("file-hr", "HR", &["Payroll", "Roster"])];
        let records = vec![record("file-hr", "Payroll", "HR")];

        let result = reconcile(&files, &records).unwrap();
        assert_eq!(result.descriptors.len(), 2);

        let payroll = &result.descriptors[0];
        assert_eq!(payroll.database_name, "Payroll");
        assert_eq!(payroll.source, DescriptorSource::Metadata);
        assert_eq!(payroll.id, records[0].dataset_id.to_string());
        assert_eq!(payroll.columns, vec!["Name", "Salary"]);
        assert_eq!(payroll.sync_status, Some(SyncStatus::Idle));
        assert_eq!(payroll.sheet_url, "https://sheets.example/file-hr");

        let roster = &result.descriptors[1];
        assert_eq!(roster.database_name, "Roster");
        assert_eq!(roster.source, DescriptorSource::Fallback);
        assert_eq!(roster.department_name, "HR");
        assert!(roster.columns.is_empty());
        assert!(roster.created_by.is_empty());
        assert!(roster.database_password.is_empty());
        assert!(roster.is_active);
        assert_eq!(result.fallback_count(), 1);
        assert!(result.orphaned.is_empty());
    }

    #[test]
    fn test_missing_record_timestamps_come_from_file() {
        let files = vec![file("f1", "Finance", &["Budget"])];
        let records = vec![record("f1", "Budget", "Finance")];
        let result = reconcile(&files, &records).unwrap();
        assert_eq!(
            result.descriptors[0].created_at,
            Some(datetime!(2024-03-01 09:00:00 UTC))
        );

        let mut stamped = record("f1", "Budget", "Finance");
        stamped.created_at = Some(datetime!(2023-01-01 00:00:00 UTC));
        let result = reconcile(&files, &[stamped]).unwrap();
        assert_eq!(
            result.descriptors[0].created_at,
            Some(datetime!(2023-01-01 00:00:00 UTC))
        );
    }

    #[test]
    fn test_order_follows_files_then_tabs() {
        let files = vec![
            file("b", "Zeta", &["z2", "z1"]),
            file("a", "Alpha", &["a1"]),
        ];
        let result = reconcile(&files, &[]).unwrap();
        let names: Vec<_> = result
            .descriptors
            .iter()
            .map(|d| d.database_name.as_str())
            .collect();
        assert_eq!(names, vec!["z2", "z1", "a1"]);
    }

    #[test]
    fn test_fallback_ids_are_distinct() {
        let files = vec![
            file("f1", "HR", &["Payroll", "Roster"]),
            file("f2", "HR", &["Payroll"]),
        ];
        let result = reconcile(&files, &[]).unwrap();
        let ids: HashSet<_> = result.descriptors.iter().map(|d| d.id.clone()).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_orphaned_records_are_reported() {
        let files = vec![file("f1", "HR", &["Payroll"])];
        let records = vec![
            record("f1", "Payroll", "HR"),
            record("f1", "Deleted", "HR"),
            record("gone", "Payroll", "HR"),
        ];
        let result = reconcile(&files, &records).unwrap();
        assert_eq!(result.descriptors.len(), 1);
        assert_eq!(
            result.orphaned,
            vec![
                DatasetKey::new("f1", "Deleted"),
                DatasetKey::new("gone", "Payroll"),
            ]
        );
    }

    #[test]
    fn test_duplicate_records_first_wins() {
        let files = vec![file("f1", "HR", &["Payroll"])];
        let first = record("f1", "Payroll", "HR");
        let mut second = record("f1", "Payroll", "Finance");
        second.created_by = "bob".to_string();
        let result = reconcile(&files, &[first.clone(), second]).unwrap();
        assert_eq!(result.descriptors.len(), 1);
        assert_eq!(result.descriptors[0].id, first.dataset_id.to_string());
        assert_eq!(result.descriptors[0].created_by, "alice");
    }

    #[test]
    fn test_repeated_file_and_tab_entries_yield_one_descriptor() {
        let files = vec![
            file("f1", "HR", &["Payroll", "Payroll"]),
            file("f1", "HR", &["Payroll"]),
        ];
        let result = reconcile(&files, &[]).unwrap();
        assert_eq!(result.descriptors.len(), 1);
    }

    #[test]
    fn test_corrupt_record_aborts() {
        let files = vec![file("f1", "HR", &["Payroll"])];
        let mut bad = record("f1", "Payroll", "HR");
        bad.columns = "not json".to_string();
        assert!(reconcile(&files, &[bad]).is_err());
    }

    #[test]
    fn test_reconcile_is_repeatable() {
        let files = vec![file("f1", "HR", &["Payroll", "Roster"])];
        let records = vec![record("f1", "Payroll", "HR")];
        let a = reconcile(&files, &records).unwrap();
        let b = reconcile(&files, &records).unwrap();
        assert_eq!(a.descriptors, b.descriptors);
    }
}
