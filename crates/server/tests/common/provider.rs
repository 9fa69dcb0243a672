//! Provider wrapper that counts calls and injects failures.

use async_trait::async_trait;
use sheetbase_core::TabularRow;
use sheetbase_provider::{
    A1Range, CreatedFile, FileEntry, FileQuery, MemoryProvider, ProviderError, ProviderResult,
    TabularProvider,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Wraps a [`MemoryProvider`], recording every call by operation name.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct CountingProvider {
    inner: MemoryProvider,
    calls: Mutex<HashMap<&'static str, u64>>,
    failing: Mutex<HashSet<&'static str>>,
}

#[allow(dead_code)]
impl CountingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls made to an operation.
    pub fn calls(&self, op: &str) -> u64 {
        self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
    }

    /// Make every later call to `op` fail with a server error.
    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    /// Stop injecting failures.
    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    fn record(&self, op: &'static str) -> ProviderResult<()> {
        *self.calls.lock().unwrap().entry(op).or_default() += 1;
        if self.failing.lock().unwrap().contains(op) {
            return Err(ProviderError::Http {
                status: 500,
                message: format!("injected {op} failure"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TabularProvider for CountingProvider {
    async fn list_files(&self, query: &FileQuery) -> ProviderResult<Vec<FileEntry>> {
        self.record("list_files")?;
        self.inner.list_files(query).await
    }

    async fn create_file(&self, title: &str) -> ProviderResult<CreatedFile> {
        self.record("create_file")?;
        self.inner.create_file(title).await
    }

    async fn move_file(&self, file_id: &str, container_id: &str) -> ProviderResult<()> {
        self.record("move_file")?;
        self.inner.move_file(file_id, container_id).await
    }

    async fn list_tabs(&self, file_id: &str) -> ProviderResult<Vec<String>> {
        self.record("list_tabs")?;
        self.inner.list_tabs(file_id).await
    }

    async fn create_tab(&self, file_id: &str, title: &str) -> ProviderResult<()> {
        self.record("create_tab")?;
        self.inner.create_tab(file_id, title).await
    }

    async fn write_range(
        &self,
        file_id: &str,
        range: &A1Range,
        values: &[TabularRow],
    ) -> ProviderResult<()> {
        self.record("write_range")?;
        self.inner.write_range(file_id, range, values).await
    }

    async fn append_rows(
        &self,
        file_id: &str,
        range: &A1Range,
        rows: &[TabularRow],
    ) -> ProviderResult<u64> {
        self.record("append_rows")?;
        self.inner.append_rows(file_id, range, rows).await
    }

    async fn read_range(&self, file_id: &str, range: &A1Range) -> ProviderResult<Vec<TabularRow>> {
        self.record("read_range")?;
        self.inner.read_range(file_id, range).await
    }

    fn backend_name(&self) -> &'static str {
        "counting"
    }
}
