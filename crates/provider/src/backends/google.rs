//! Google Drive + Sheets provider backend.
//!
//! Folder listings and file moves go through the Drive v3 API. Spreadsheet
//! creation, tabs, and cell values go through the Sheets v4 API. Every call
//! carries a bearer token from the backend's [`TokenSource`] and runs under
//! its [`RetryPolicy`].

use crate::credentials::TokenSource;
use crate::error::{ProviderError, ProviderResult};
use crate::range::A1Range;
use crate::retry::RetryPolicy;
use crate::traits::{CreatedFile, FileEntry, FileQuery, TabularProvider};
use async_trait::async_trait;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use sheetbase_core::TabularRow;
use std::sync::Arc;
use time::OffsetDateTime;

/// Characters escaped when a file id or A1 range is used as a path segment.
/// `!` and `:` stay literal because the Sheets API addresses ranges and
/// custom methods with them.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'?')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const DRIVE_PAGE_SIZE: &str = "1000";
const DRIVE_FILE_FIELDS: &str = "nextPageToken,files(id,name,createdTime,modifiedTime,webViewLink)";

fn encode_segment(s: &str) -> String {
    utf8_percent_encode(s, PATH_SEGMENT).to_string()
}

/// Quote a literal for a Drive search query.
fn drive_literal(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Build the Drive search expression for a folder listing.
pub fn drive_query(query: &FileQuery) -> String {
    let mut q = format!(
        "{} in parents and mimeType={} and trashed=false",
        drive_literal(&query.container_id),
        drive_literal(&query.mime_type)
    );
    if let Some(name) = &query.name {
        q.push_str(" and name=");
        q.push_str(&drive_literal(name));
    }
    q
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    created_time: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    modified_time: Option<OffsetDateTime>,
    #[serde(default)]
    web_view_link: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct DriveParents {
    #[serde(default)]
    parents: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spreadsheet {
    spreadsheet_id: String,
    #[serde(default)]
    spreadsheet_url: Option<String>,
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    #[serde(default)]
    updates: Option<AppendUpdates>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    #[serde(default)]
    updated_rows: Option<u64>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Map a failed API response to a provider error.
///
/// Sheets reports a duplicate tab title as a 400 whose message says the name
/// already exists. Credential failures and rate limiting stay `Http` so they
/// surface as server faults.
fn status_error(status: StatusCode, body: &str, what: &str) -> ProviderError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect());
    match status {
        StatusCode::NOT_FOUND => ProviderError::NotFound(format!("{what}: {message}")),
        StatusCode::CONFLICT => ProviderError::AlreadyExists(format!("{what}: {message}")),
        StatusCode::BAD_REQUEST if message.contains("already exists") => {
            ProviderError::AlreadyExists(format!("{what}: {message}"))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            ProviderError::Http {
                status: status.as_u16(),
                message,
            }
        }
        s if s.is_client_error() => ProviderError::Rejected {
            status: s.as_u16(),
            message,
        },
        _ => ProviderError::Http {
            status: status.as_u16(),
            message,
        },
    }
}

/// Provider backed by Google Drive and Google Sheets.
pub struct GoogleProvider {
    http: reqwest::Client,
    drive_base_url: String,
    sheets_base_url: String,
    tokens: Arc<dyn TokenSource>,
    policy: RetryPolicy,
}

impl GoogleProvider {
    pub fn new(
        drive_base_url: &str,
        sheets_base_url: &str,
        tokens: Arc<dyn TokenSource>,
        policy: RetryPolicy,
    ) -> ProviderResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("sheetbase/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            drive_base_url: drive_base_url.trim_end_matches('/').to_string(),
            sheets_base_url: sheets_base_url.trim_end_matches('/').to_string(),
            tokens,
            policy,
        })
    }

    fn drive(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.drive_base_url))
    }

    fn sheets(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.sheets_base_url))
    }

    /// Authorize and send a request, then decode a JSON success body.
    async fn send<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        what: &str,
    ) -> ProviderResult<T> {
        let token = self.tokens.access_token().await?;
        let response = req.bearer_auth(token).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                self.tokens.invalidate().await;
            }
            return Err(status_error(status, &body, what));
        }
        serde_json::from_str(&body).map_err(|e| ProviderError::Decode(format!("{what}: {e}")))
    }

    async fn list_page(
        &self,
        q: &str,
        page_token: Option<&str>,
    ) -> ProviderResult<DriveFileList> {
        let mut params = vec![
            ("q", q),
            ("fields", DRIVE_FILE_FIELDS),
            ("pageSize", DRIVE_PAGE_SIZE),
            ("supportsAllDrives", "true"),
            ("includeItemsFromAllDrives", "true"),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        self.policy
            .run("list_files", || {
                self.send(self.drive(Method::GET, "/files").query(&params), "list files")
            })
            .await
    }
}

#[async_trait]
impl TabularProvider for GoogleProvider {
    async fn list_files(&self, query: &FileQuery) -> ProviderResult<Vec<FileEntry>> {
        let q = drive_query(query);
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.list_page(&q, page_token.as_deref()).await?;
            entries.extend(page.files.into_iter().map(|f| FileEntry {
                id: f.id,
                name: f.name,
                created_time: f.created_time,
                modified_time: f.modified_time,
                web_view_link: f.web_view_link,
            }));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(
            container_id = %query.container_id,
            files = entries.len(),
            "Listed provider files"
        );
        Ok(entries)
    }

    async fn create_file(&self, title: &str) -> ProviderResult<CreatedFile> {
        let body = json!({ "properties": { "title": title } });
        let created: Spreadsheet = self
            .policy
            .once(
                "create_file",
                self.send(
                    self.sheets(Method::POST, "/spreadsheets").json(&body),
                    "create spreadsheet",
                ),
            )
            .await?;

        let url = created.spreadsheet_url.unwrap_or_else(|| {
            format!(
                "https://docs.google.com/spreadsheets/d/{}/edit",
                created.spreadsheet_id
            )
        });
        Ok(CreatedFile {
            id: created.spreadsheet_id,
            url,
        })
    }

    async fn move_file(&self, file_id: &str, container_id: &str) -> ProviderResult<()> {
        let path = format!("/files/{}", encode_segment(file_id));

        // A new spreadsheet starts under the creator's root; Drive allows a
        // single parent, so the old ones are removed in the same update.
        let current: DriveParents = self
            .policy
            .run("move_file", || {
                self.send(
                    self.drive(Method::GET, &path)
                        .query(&[("fields", "parents"), ("supportsAllDrives", "true")]),
                    "file parents",
                )
            })
            .await?;
        let stale: Vec<&str> = current
            .parents
            .iter()
            .map(String::as_str)
            .filter(|p| *p != container_id)
            .collect();
        if stale.is_empty() && current.parents.iter().any(|p| p == container_id) {
            return Ok(());
        }

        let remove = stale.join(",");
        let mut params = vec![
            ("addParents", container_id),
            ("fields", "id,parents"),
            ("supportsAllDrives", "true"),
        ];
        if !remove.is_empty() {
            params.push(("removeParents", remove.as_str()));
        }
        let _: serde_json::Value = self
            .policy
            .run("move_file", || {
                self.send(
                    self.drive(Method::PATCH, &path)
                        .query(&params)
                        .json(&json!({})),
                    "move file",
                )
            })
            .await?;
        Ok(())
    }

    async fn list_tabs(&self, file_id: &str) -> ProviderResult<Vec<String>> {
        let path = format!("/spreadsheets/{}", encode_segment(file_id));
        let spreadsheet: Spreadsheet = self
            .policy
            .run("list_tabs", || {
                self.send(
                    self.sheets(Method::GET, &path)
                        .query(&[("fields", "spreadsheetId,sheets.properties.title")]),
                    "list tabs",
                )
            })
            .await?;
        Ok(spreadsheet
            .sheets
            .into_iter()
            .map(|s| s.properties.title)
            .collect())
    }

    async fn create_tab(&self, file_id: &str, title: &str) -> ProviderResult<()> {
        let path = format!("/spreadsheets/{}:batchUpdate", encode_segment(file_id));
        let body = json!({
            "requests": [{ "addSheet": { "properties": { "title": title } } }]
        });
        let _: serde_json::Value = self
            .policy
            .once(
                "create_tab",
                self.send(self.sheets(Method::POST, &path).json(&body), "create tab"),
            )
            .await?;
        Ok(())
    }

    async fn write_range(
        &self,
        file_id: &str,
        range: &A1Range,
        values: &[TabularRow],
    ) -> ProviderResult<()> {
        let a1 = range.to_string();
        let path = format!(
            "/spreadsheets/{}/values/{}",
            encode_segment(file_id),
            encode_segment(&a1)
        );
        let body = json!({ "range": a1, "majorDimension": "ROWS", "values": values });
        let _: serde_json::Value = self
            .policy
            .run("write_range", || {
                self.send(
                    self.sheets(Method::PUT, &path)
                        .query(&[("valueInputOption", "RAW")])
                        .json(&body),
                    "write range",
                )
            })
            .await?;
        Ok(())
    }

    async fn append_rows(
        &self,
        file_id: &str,
        range: &A1Range,
        rows: &[TabularRow],
    ) -> ProviderResult<u64> {
        let a1 = range.to_string();
        let path = format!(
            "/spreadsheets/{}/values/{}:append",
            encode_segment(file_id),
            encode_segment(&a1)
        );
        let body = json!({ "majorDimension": "ROWS", "values": rows });
        // A retried append may land twice; ingestion is at-least-once.
        let response: AppendResponse = self
            .policy
            .run("append_rows", || {
                self.send(
                    self.sheets(Method::POST, &path)
                        .query(&[
                            ("valueInputOption", "RAW"),
                            ("insertDataOption", "INSERT_ROWS"),
                        ])
                        .json(&body),
                    "append rows",
                )
            })
            .await?;

        Ok(response
            .updates
            .and_then(|u| u.updated_rows)
            .unwrap_or(rows.len() as u64))
    }

    async fn read_range(&self, file_id: &str, range: &A1Range) -> ProviderResult<Vec<TabularRow>> {
        let a1 = range.to_string();
        let path = format!(
            "/spreadsheets/{}/values/{}",
            encode_segment(file_id),
            encode_segment(&a1)
        );
        let value_range: ValueRange = self
            .policy
            .run("read_range", || {
                self.send(
                    self.sheets(Method::GET, &path)
                        .query(&[("majorDimension", "ROWS")]),
                    "read range",
                )
            })
            .await?;

        Ok(value_range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "google"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_query_without_name() {
        let query = FileQuery {
            container_id: "folder-1".to_string(),
            mime_type: sheetbase_core::SPREADSHEET_MIME_TYPE.to_string(),
            name: None,
        };
        assert_eq!(
            drive_query(&query),
            "'folder-1' in parents and mimeType='application/vnd.google-apps.spreadsheet' \
             and trashed=false"
        );
    }

    #[test]
    fn test_drive_query_escapes_name() {
        let query = FileQuery {
            container_id: "folder-1".to_string(),
            mime_type: sheetbase_core::SPREADSHEET_MIME_TYPE.to_string(),
            name: Some("Ops' \\ Team".to_string()),
        };
        assert!(drive_query(&query).ends_with(" and name='Ops\\' \\\\ Team'"));
    }

    #[test]
    fn test_path_segments_keep_range_syntax() {
        assert_eq!(encode_segment("'Budget2024'!A1"), "'Budget2024'!A1");
        assert_eq!(encode_segment("'Q1 Budget'!A1"), "'Q1%20Budget'!A1");
        assert_eq!(encode_segment("a/b?c"), "a%2Fb%3Fc");
    }

    #[test]
    fn test_status_error_mapping() {
        let duplicate = json!({
            "error": {
                "code": 400,
                "message": "A sheet with the name \"Budget2024\" already exists."
            }
        })
        .to_string();
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, &duplicate, "create tab"),
            ProviderError::AlreadyExists(_)
        ));
        assert!(matches!(
            status_error(StatusCode::CONFLICT, "", "create tab"),
            ProviderError::AlreadyExists(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "Unable to parse range", "read range"),
            ProviderError::Rejected { status: 400, .. }
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, "", "move file"),
            ProviderError::Http { status: 403, .. }
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, "", "list files"),
            ProviderError::Http { status: 502, .. }
        ));
    }

    #[test]
    fn test_non_string_cells_are_stringified() {
        assert_eq!(cell_to_string(json!("x")), "x");
        assert_eq!(cell_to_string(json!(12)), "12");
        assert_eq!(cell_to_string(json!(true)), "true");
        assert_eq!(cell_to_string(serde_json::Value::Null), "");
    }
}
