use async_trait::async_trait;
use khatt_core::ExtractedRecord;
use serde_json::Value;

use crate::client::{SheetsClient, SheetsError};
use crate::token::TokenSource;

pub const TAB_TITLE: &str = "البيانات المستخرجة";
pub const HEADER: [&str; 2] = ["الاسم الكامل", "الرقم القومي"];

/// Where a new export ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSheet {
    pub sheet_url: String,
    pub sheet_id: String,
}

/// The spreadsheet side of export: create a new sheet or add rows to one.
#[async_trait]
pub trait SheetExporter: Send + Sync {
    async fn create(
        &self,
        records: &[ExtractedRecord],
        title: &str,
    ) -> Result<CreatedSheet, SheetsError>;

    /// Append rows to the spreadsheet at `sheet_url`, returning its URL.
    async fn append(
        &self,
        records: &[ExtractedRecord],
        sheet_url: &str,
    ) -> Result<String, SheetsError>;
}

#[async_trait]
impl<E: SheetExporter + ?Sized> SheetExporter for std::sync::Arc<E> {
    async fn create(
        &self,
        records: &[ExtractedRecord],
        title: &str,
    ) -> Result<CreatedSheet, SheetsError> {
        (**self).create(records, title).await
    }

    async fn append(
        &self,
        records: &[ExtractedRecord],
        sheet_url: &str,
    ) -> Result<String, SheetsError> {
        (**self).append(records, sheet_url).await
    }
}

pub fn sheet_url(spreadsheet_id: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{spreadsheet_id}")
}

/// Accepts `https://docs.google.com/spreadsheets/d/<id>/edit#gid=0` style URLs
/// or a bare spreadsheet id.
pub fn spreadsheet_id_from_url(input: &str) -> Option<String> {
    let input = input.trim();
    let is_id_char = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';

    if let Some((_, rest)) = input.split_once("/spreadsheets/d/") {
        let id: String = rest.chars().take_while(|c| is_id_char(*c)).collect();
        return (!id.is_empty()).then_some(id);
    }
    (!input.is_empty() && input.chars().all(is_id_char)).then(|| input.to_string())
}

/// Name and ID columns, one row per record.
pub fn record_rows(records: &[ExtractedRecord]) -> Vec<Vec<String>> {
    records
        .iter()
        .map(|r| vec![r.name.clone(), r.national_id.clone()])
        .collect()
}

/// Bold white-on-blue, right-aligned header plus auto-sized columns.
pub fn header_format_requests(tab_id: i64) -> Value {
    serde_json::json!([
        {
            "repeatCell": {
                "range": { "sheetId": tab_id, "startRowIndex": 0, "endRowIndex": 1 },
                "cell": {
                    "userEnteredFormat": {
                        "backgroundColor": { "red": 0.2, "green": 0.5, "blue": 0.8 },
                        "textFormat": {
                            "foregroundColor": { "red": 1.0, "green": 1.0, "blue": 1.0 },
                            "fontSize": 12,
                            "bold": true
                        },
                        "horizontalAlignment": "RIGHT"
                    }
                },
                "fields": "userEnteredFormat(backgroundColor,textFormat,horizontalAlignment)"
            }
        },
        {
            "autoResizeDimensions": {
                "dimensions": {
                    "sheetId": tab_id,
                    "dimension": "COLUMNS",
                    "startIndex": 0,
                    "endIndex": HEADER.len()
                }
            }
        }
    ])
}

pub struct GoogleSheetsExporter<T> {
    client: SheetsClient<T>,
}

impl<T: TokenSource> GoogleSheetsExporter<T> {
    pub fn new(client: SheetsClient<T>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<T: TokenSource> SheetExporter for GoogleSheetsExporter<T> {
    async fn create(
        &self,
        records: &[ExtractedRecord],
        title: &str,
    ) -> Result<CreatedSheet, SheetsError> {
        let created = self.client.create_spreadsheet(title, TAB_TITLE).await?;
        let id = created.spreadsheet_id;

        let mut values = vec![HEADER.iter().map(|h| h.to_string()).collect::<Vec<_>>()];
        values.extend(record_rows(records));
        self.client
            .update_values(&id, &format!("'{TAB_TITLE}'!A1"), values)
            .await?;
        self.client
            .batch_update(&id, header_format_requests(created.tab_id))
            .await?;

        tracing::info!(spreadsheet = %id, rows = records.len(), "Spreadsheet created");
        Ok(CreatedSheet { sheet_url: sheet_url(&id), sheet_id: id })
    }

    async fn append(
        &self,
        records: &[ExtractedRecord],
        sheet_url_in: &str,
    ) -> Result<String, SheetsError> {
        let id = spreadsheet_id_from_url(sheet_url_in)
            .ok_or_else(|| SheetsError::InvalidUrl(sheet_url_in.to_string()))?;
        // Columns A:B of the first tab.
        self.client.append_values(&id, "A:B", record_rows(records)).await?;

        tracing::info!(spreadsheet = %id, rows = records.len(), "Rows appended");
        Ok(sheet_url(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use khatt_core::RecordId;

    #[test]
    fn id_from_full_url() {
        assert_eq!(
            spreadsheet_id_from_url("https://docs.google.com/spreadsheets/d/1AbC-d_9/edit#gid=0"),
            Some("1AbC-d_9".to_string())
        );
        assert_eq!(
            spreadsheet_id_from_url("https://docs.google.com/spreadsheets/d/xyz"),
            Some("xyz".to_string())
        );
    }

    #[test]
    fn bare_id_is_accepted() {
        assert_eq!(spreadsheet_id_from_url("  1AbCdef  "), Some("1AbCdef".to_string()));
    }

    #[test]
    fn unrelated_urls_are_rejected() {
        assert_eq!(spreadsheet_id_from_url("https://example.com/foo"), None);
        assert_eq!(spreadsheet_id_from_url(""), None);
        assert_eq!(spreadsheet_id_from_url("https://docs.google.com/spreadsheets/d/"), None);
    }

    #[test]
    fn sheet_url_roundtrips_id() {
        assert_eq!(spreadsheet_id_from_url(&sheet_url("abc123")), Some("abc123".into()));
    }

    #[test]
    fn rows_follow_record_order() {
        let records = vec![
            ExtractedRecord {
                id: RecordId::from("1"),
                name: "أحمد".into(),
                national_id: "111".into(),
                source_image_id: None,
            },
            ExtractedRecord {
                id: RecordId::from("2"),
                name: "منى".into(),
                national_id: "222".into(),
                source_image_id: Some("p.png".into()),
            },
        ];
        assert_eq!(
            record_rows(&records),
            vec![
                vec!["أحمد".to_string(), "111".to_string()],
                vec!["منى".to_string(), "222".to_string()],
            ]
        );
    }

    #[test]
    fn header_format_targets_tab() {
        let requests = header_format_requests(7);
        assert_eq!(requests[0]["repeatCell"]["range"]["sheetId"], 7);
        assert_eq!(requests[1]["autoResizeDimensions"]["dimensions"]["endIndex"], 2);
        assert_eq!(
            requests[0]["repeatCell"]["cell"]["userEnteredFormat"]["horizontalAlignment"],
            "RIGHT"
        );
    }
}
