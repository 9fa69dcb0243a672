//! Row ingestion into dataset tabs.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use sheetbase_core::TabularRow;
use sheetbase_provider::{A1Range, TabularProvider};
use tracing::{info, warn};

/// Append rows after the tab's existing content.
///
/// An empty batch is rejected before the provider is called. Row widths are
/// not checked against the header.
pub async fn append_rows(
    provider: &dyn TabularProvider,
    sheet_id: &str,
    tab: &str,
    rows: &[TabularRow],
) -> ApiResult<u64> {
    if rows.is_empty() {
        metrics::record_ingestion_failure("empty");
        return Err(ApiError::Validation(
            "rows must contain at least one row".to_string(),
        ));
    }

    let appended = provider
        .append_rows(sheet_id, &A1Range::origin(tab), rows)
        .await
        .inspect_err(|e| {
            metrics::record_ingestion_failure("provider");
            warn!(sheet_id = %sheet_id, tab = %tab, error = %e, "Append failed");
        })?;

    metrics::ROWS_APPENDED.inc_by(appended);
    info!(sheet_id = %sheet_id, tab = %tab, rows = appended, "Appended rows");
    Ok(appended)
}

/// Parse a delimited payload into rows.
///
/// The first record is the header and is not returned. Every record must
/// have the header's width.
pub fn parse_csv(data: &[u8]) -> ApiResult<Vec<TabularRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(data);

    reader.headers().map_err(parse_error)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(parse_error)?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

fn parse_error(e: csv::Error) -> ApiError {
    metrics::record_ingestion_failure("parse");
    let detail = match e.position() {
        Some(pos) => format!("line {}: {e}", pos.line()),
        None => e.to_string(),
    };
    ApiError::Parse(detail)
}

/// Parse a CSV payload completely, then append its data rows in one call.
///
/// A parse error aborts before anything is written.
pub async fn ingest_csv(
    provider: &dyn TabularProvider,
    sheet_id: &str,
    tab: &str,
    data: &[u8],
) -> ApiResult<u64> {
    let rows = parse_csv(data)?;
    append_rows(provider, sheet_id, tab, &rows).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_skips_header() {
        let rows = parse_csv(b"Month,Amount\nJan,10\nFeb,20\n").unwrap();
        assert_eq!(
            rows,
            vec![
                vec!["Jan".to_string(), "10".to_string()],
                vec!["Feb".to_string(), "20".to_string()],
            ]
        );
    }

    #[test]
    fn test_parse_csv_handles_quoted_fields() {
        let rows = parse_csv(b"Name,Note\n\"Smith, J\",\"said \"\"hi\"\"\"\n").unwrap();
        assert_eq!(rows[0], vec!["Smith, J".to_string(), "said \"hi\"".to_string()]);
    }

    #[test]
    fn test_parse_csv_rejects_ragged_record() {
        let err = parse_csv(b"Month,Amount\nJan,10\nFeb\n").unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_parse_csv_rejects_invalid_utf8() {
        let err = parse_csv(b"Month,Amount\n\xff\xfe,10\n").unwrap_err();
        assert_eq!(err.code(), "parse_error");
    }

    #[test]
    fn test_parse_csv_header_only_is_empty() {
        assert!(parse_csv(b"Month,Amount\n").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_rows_rejects_empty_batch() {
        let provider = sheetbase_provider::MemoryProvider::new();
        let err = append_rows(&provider, "missing", "Tab", &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
