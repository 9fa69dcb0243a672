//! In-process provider backend.
//!
//! Holds files and tabs in memory with the same visible semantics as the
//! hosted service: listings return files in creation order, appends land
//! after the last populated row, and reads return the populated rows only.
//! Contents are lost when the process exits.

use crate::error::{ProviderError, ProviderResult};
use crate::range::A1Range;
use crate::traits::{CreatedFile, FileEntry, FileQuery, TabularProvider};
use async_trait::async_trait;
use sheetbase_core::{SPREADSHEET_MIME_TYPE, TabularRow};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug)]
struct MemoryTab {
    title: String,
    values: Vec<TabularRow>,
}

#[derive(Debug)]
struct MemoryFile {
    id: String,
    name: String,
    parents: Vec<String>,
    created_time: OffsetDateTime,
    modified_time: OffsetDateTime,
    tabs: Vec<MemoryTab>,
}

impl MemoryFile {
    fn url(&self) -> String {
        spreadsheet_url(&self.id)
    }

    fn tab_mut(&mut self, title: &str) -> ProviderResult<&mut MemoryTab> {
        let file_id = &self.id;
        self.tabs
            .iter_mut()
            .find(|t| t.title == title)
            .ok_or_else(|| ProviderError::NotFound(format!("tab {title} in file {file_id}")))
    }
}

fn spreadsheet_url(id: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{id}/edit")
}

/// In-memory tabular provider.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    files: RwLock<Vec<MemoryFile>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

fn file_mut<'a>(files: &'a mut [MemoryFile], file_id: &str) -> ProviderResult<&'a mut MemoryFile> {
    files
        .iter_mut()
        .find(|f| f.id == file_id)
        .ok_or_else(|| ProviderError::NotFound(format!("file {file_id}")))
}

/// Drop trailing rows with no populated cell, and trailing empty cells.
fn populated(values: &[TabularRow]) -> Vec<TabularRow> {
    let mut rows: Vec<TabularRow> = values
        .iter()
        .map(|row| {
            let end = row.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
            row[..end].to_vec()
        })
        .collect();
    while rows.last().is_some_and(|r| r.is_empty()) {
        rows.pop();
    }
    rows
}

#[async_trait]
impl TabularProvider for MemoryProvider {
    async fn list_files(&self, query: &FileQuery) -> ProviderResult<Vec<FileEntry>> {
        // Every memory file is a spreadsheet.
        if query.mime_type != SPREADSHEET_MIME_TYPE {
            return Ok(Vec::new());
        }

        let files = self.files.read().await;
        Ok(files
            .iter()
            .filter(|f| f.parents.iter().any(|p| p == &query.container_id))
            .filter(|f| query.name.as_ref().is_none_or(|name| &f.name == name))
            .map(|f| FileEntry {
                id: f.id.clone(),
                name: f.name.clone(),
                created_time: Some(f.created_time),
                modified_time: Some(f.modified_time),
                web_view_link: Some(f.url()),
            })
            .collect())
    }

    async fn create_file(&self, title: &str) -> ProviderResult<CreatedFile> {
        let now = OffsetDateTime::now_utc();
        let id = Uuid::new_v4().simple().to_string();
        let file = MemoryFile {
            id: id.clone(),
            name: title.to_string(),
            parents: Vec::new(),
            created_time: now,
            modified_time: now,
            // New spreadsheets start with one default tab, as the hosted service does.
            tabs: vec![MemoryTab {
                title: "Sheet1".to_string(),
                values: Vec::new(),
            }],
        };
        let url = file.url();
        self.files.write().await.push(file);
        Ok(CreatedFile { id, url })
    }

    async fn move_file(&self, file_id: &str, container_id: &str) -> ProviderResult<()> {
        let mut files = self.files.write().await;
        let file = file_mut(&mut files, file_id)?;
        if !file.parents.iter().any(|p| p == container_id) {
            file.parents.push(container_id.to_string());
        }
        Ok(())
    }

    async fn list_tabs(&self, file_id: &str) -> ProviderResult<Vec<String>> {
        let files = self.files.read().await;
        let file = files
            .iter()
            .find(|f| f.id == file_id)
            .ok_or_else(|| ProviderError::NotFound(format!("file {file_id}")))?;
        Ok(file.tabs.iter().map(|t| t.title.clone()).collect())
    }

    async fn create_tab(&self, file_id: &str, title: &str) -> ProviderResult<()> {
        let mut files = self.files.write().await;
        let file = file_mut(&mut files, file_id)?;
        if file.tabs.iter().any(|t| t.title == title) {
            return Err(ProviderError::AlreadyExists(format!(
                "tab {title} in file {file_id}"
            )));
        }
        file.tabs.push(MemoryTab {
            title: title.to_string(),
            values: Vec::new(),
        });
        file.modified_time = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn write_range(
        &self,
        file_id: &str,
        range: &A1Range,
        values: &[TabularRow],
    ) -> ProviderResult<()> {
        let mut files = self.files.write().await;
        let file = file_mut(&mut files, file_id)?;
        let tab = file.tab_mut(&range.tab)?;
        let start = range.start();

        for (i, row) in values.iter().enumerate() {
            let r = start.row + i;
            if tab.values.len() <= r {
                tab.values.resize_with(r + 1, Vec::new);
            }
            let target = &mut tab.values[r];
            if target.len() < start.col + row.len() {
                target.resize(start.col + row.len(), String::new());
            }
            for (j, cell) in row.iter().enumerate() {
                target[start.col + j] = cell.clone();
            }
        }
        file.modified_time = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn append_rows(
        &self,
        file_id: &str,
        range: &A1Range,
        rows: &[TabularRow],
    ) -> ProviderResult<u64> {
        let mut files = self.files.write().await;
        let file = file_mut(&mut files, file_id)?;
        let tab = file.tab_mut(&range.tab)?;

        tab.values = populated(&tab.values);
        tab.values.extend(rows.iter().cloned());
        file.modified_time = OffsetDateTime::now_utc();
        Ok(rows.len() as u64)
    }

    async fn read_range(&self, file_id: &str, range: &A1Range) -> ProviderResult<Vec<TabularRow>> {
        let files = self.files.read().await;
        let file = files
            .iter()
            .find(|f| f.id == file_id)
            .ok_or_else(|| ProviderError::NotFound(format!("file {file_id}")))?;
        let tab = file
            .tabs
            .iter()
            .find(|t| t.title == range.tab)
            .ok_or_else(|| ProviderError::NotFound(format!("tab {} in file {file_id}", range.tab)))?;

        let start = range.start();
        Ok(populated(&tab.values)
            .into_iter()
            .skip(start.row)
            .map(|row| row.into_iter().skip(start.col).collect())
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
