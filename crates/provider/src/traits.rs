//! Provider trait definitions.

use crate::error::ProviderResult;
use crate::range::A1Range;
use async_trait::async_trait;
use sheetbase_core::TabularRow;
use time::OffsetDateTime;

/// Filter for a folder listing.
#[derive(Clone, Debug)]
pub struct FileQuery {
    /// Folder whose direct children are listed.
    pub container_id: String,
    /// Only files of this MIME type are returned.
    pub mime_type: String,
    /// Exact file name to match, if any.
    pub name: Option<String>,
}

/// A file as reported by the folder listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub id: String,
    pub name: String,
    pub created_time: Option<OffsetDateTime>,
    pub modified_time: Option<OffsetDateTime>,
    pub web_view_link: Option<String>,
}

/// A listed file together with its tab titles, in provider order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderFile {
    pub id: String,
    pub name: String,
    pub created_time: Option<OffsetDateTime>,
    pub modified_time: Option<OffsetDateTime>,
    pub web_view_link: Option<String>,
    pub tabs: Vec<String>,
}

impl ProviderFile {
    pub fn new(entry: FileEntry, tabs: Vec<String>) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            created_time: entry.created_time,
            modified_time: entry.modified_time,
            web_view_link: entry.web_view_link,
            tabs,
        }
    }
}

/// Identifiers of a newly created file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedFile {
    pub id: String,
    pub url: String,
}

/// Accessor over an external spreadsheet service.
///
/// Files live in folders and hold ordered, titled tabs of string cells.
/// Implementations bound every call with a timeout. Idempotent calls may be
/// retried; `create_file` and `create_tab` are attempted once.
#[async_trait]
pub trait TabularProvider: Send + Sync + 'static {
    /// List the files directly under a folder.
    async fn list_files(&self, query: &FileQuery) -> ProviderResult<Vec<FileEntry>>;

    /// Create a spreadsheet file. The new file is not attached to any folder.
    async fn create_file(&self, title: &str) -> ProviderResult<CreatedFile>;

    /// Attach a file to a folder.
    async fn move_file(&self, file_id: &str, container_id: &str) -> ProviderResult<()>;

    /// List a file's tab titles in display order.
    async fn list_tabs(&self, file_id: &str) -> ProviderResult<Vec<String>>;

    /// Add a tab to a file.
    async fn create_tab(&self, file_id: &str, title: &str) -> ProviderResult<()>;

    /// Overwrite cells starting at the range's anchor.
    async fn write_range(
        &self,
        file_id: &str,
        range: &A1Range,
        values: &[TabularRow],
    ) -> ProviderResult<()>;

    /// Append rows after the existing content of the range's tab.
    /// Returns the number of rows written.
    async fn append_rows(
        &self,
        file_id: &str,
        range: &A1Range,
        rows: &[TabularRow],
    ) -> ProviderResult<u64>;

    /// Read every populated row of a range.
    async fn read_range(&self, file_id: &str, range: &A1Range) -> ProviderResult<Vec<TabularRow>>;

    /// Static backend identifier used in logs and metrics.
    fn backend_name(&self) -> &'static str;
}
