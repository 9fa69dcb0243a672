//! Core domain types and shared logic for sheetbase.
//!
//! This crate defines the data model shared by the other crates:
//! - Dataset descriptors (the reconciled view of one spreadsheet tab)
//! - Dataset identifiers, including the synthesized fallback form
//! - Tabular rows and header-keyed records
//! - Configuration types

pub mod config;
pub mod dataset;
pub mod error;
pub mod row;

pub use dataset::{
    DatasetDescriptor, DatasetKey, DescriptorSource, SyncStatus, fallback_dataset_id,
    validate_dataset_name, validate_department_name,
};
pub use error::{Error, Result};
pub use row::{TabRecord, TabularRow, rows_to_records};

/// MIME type the spreadsheet provider uses for spreadsheet files.
pub const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

/// Maximum length of a tab title accepted by the provider.
pub const MAX_TAB_NAME_LEN: usize = 100;
