//! Dataset descriptor types.
//!
//! A dataset is one tab inside a provider spreadsheet file. The file itself
//! groups datasets by department. The descriptor is the read-time view that
//! combines provider fields with the persisted metadata record, if one exists.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// Separator between sheet id and tab name in synthesized descriptor ids.
///
/// Metadata ids are UUIDs, which never contain this sequence, so fallback ids
/// cannot collide with record ids.
const FALLBACK_ID_SEPARATOR: &str = "::";

/// Build the deterministic id of a descriptor that has no metadata record.
pub fn fallback_dataset_id(sheet_id: &str, database_name: &str) -> String {
    format!("{sheet_id}{FALLBACK_ID_SEPARATOR}{database_name}")
}

/// Join key between provider tabs and metadata records.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatasetKey {
    pub sheet_id: String,
    pub database_name: String,
}

impl DatasetKey {
    pub fn new(sheet_id: impl Into<String>, database_name: impl Into<String>) -> Self {
        Self {
            sheet_id: sheet_id.into(),
            database_name: database_name.into(),
        }
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.sheet_id, self.database_name)
    }
}

/// Synchronization marker persisted on metadata records.
///
/// New records are written as `Idle`. The other values are accepted when a
/// record is read or patched, but nothing in this service sets them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Syncing => "syncing",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "idle" => Ok(Self::Idle),
            "syncing" => Ok(Self::Syncing),
            "failed" => Ok(Self::Failed),
            other => Err(crate::Error::InvalidSyncStatus(other.to_string())),
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a descriptor's fields came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorSource {
    /// Backed by a metadata record.
    Metadata,
    /// Synthesized from provider fields because no record matched.
    Fallback,
}

/// Reconciled view of one dataset tab.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    pub id: String,
    pub sheet_id: String,
    /// Tab name inside the spreadsheet file.
    pub database_name: String,
    pub department_name: String,
    pub created_by: String,
    pub database_password: String,
    pub columns: Vec<String>,
    pub is_active: bool,
    pub sheet_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_status: Option<SyncStatus>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    pub source: DescriptorSource,
}

impl DatasetDescriptor {
    /// Whether this descriptor was synthesized without metadata.
    pub fn is_fallback(&self) -> bool {
        self.source == DescriptorSource::Fallback
    }
}

/// Validate a dataset (tab) name.
pub fn validate_dataset_name(name: &str) -> crate::Result<()> {
    if name.trim().is_empty() {
        return Err(crate::Error::InvalidDatasetName(
            "dataset name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > crate::MAX_TAB_NAME_LEN {
        return Err(crate::Error::InvalidDatasetName(format!(
            "dataset name exceeds {} characters",
            crate::MAX_TAB_NAME_LEN
        )));
    }
    Ok(())
}

/// Validate a department name (used as the provider file title).
pub fn validate_department_name(name: &str) -> crate::Result<()> {
    if name.trim().is_empty() {
        return Err(crate::Error::InvalidDepartmentName(
            "department name must not be empty".to_string(),
        ));
    }
    // Names are interpolated into provider search queries.
    if name.contains('\n') || name.contains('\r') {
        return Err(crate::Error::InvalidDepartmentName(
            "department name must be a single line".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_id_is_deterministic_and_distinct() {
        let a = fallback_dataset_id("sheet-1", "Payroll");
        let b = fallback_dataset_id("sheet-1", "Payroll");
        let c = fallback_dataset_id("sheet-1", "Roster");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, "sheet-1::Payroll");
    }

    #[test]
    fn sync_status_roundtrip() {
        for status in [SyncStatus::Idle, SyncStatus::Syncing, SyncStatus::Failed] {
            assert_eq!(SyncStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(SyncStatus::parse("busy").is_err());
    }

    #[test]
    fn descriptor_serializes_timestamps_as_rfc3339() {
        let descriptor = DatasetDescriptor {
            id: "id".to_string(),
            sheet_id: "s".to_string(),
            database_name: "t".to_string(),
            department_name: "d".to_string(),
            created_by: String::new(),
            database_password: String::new(),
            columns: vec![],
            is_active: true,
            sheet_url: String::new(),
            sync_status: None,
            created_at: Some(time::macros::datetime!(2024-01-02 03:04:05 UTC)),
            updated_at: None,
            source: DescriptorSource::Fallback,
        };
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["created_at"], "2024-01-02T03:04:05Z");
        assert!(json["updated_at"].is_null());
        assert_eq!(json["source"], "fallback");
        assert!(json.get("sync_status").is_none());
    }

    #[test]
    fn dataset_name_validation() {
        assert!(validate_dataset_name("Budget2024").is_ok());
        assert!(validate_dataset_name("   ").is_err());
        assert!(validate_dataset_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn department_name_validation() {
        assert!(validate_department_name("Finance").is_ok());
        assert!(validate_department_name("").is_err());
        assert!(validate_department_name("Fin\nance").is_err());
    }
}
