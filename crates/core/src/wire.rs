//! JSON bodies exchanged between the workflow client and the HTTP service.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::record::ExtractedRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessImageResponse {
    pub success: bool,
    #[serde(default)]
    pub records: Vec<ExtractedRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResult {
    pub file_name: String,
    pub success: bool,
    pub record_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessImagesResponse {
    pub success: bool,
    #[serde(default)]
    pub records: Vec<ExtractedRecord>,
    #[serde(default)]
    pub results: Vec<FileResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSheetRequest {
    pub records: Vec<ExtractedRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSheetResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendSheetRequest {
    pub records: Vec<ExtractedRecord>,
    pub sheet_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendSheetResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Generic failure envelope used by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { success: false, error: error.into() }
    }
}

/// "Extracted data - <date>", the title used when the user gives none.
pub fn default_sheet_title(date: NaiveDate) -> String {
    format!("بيانات مستخرجة - {}", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_image_response_tolerates_missing_records() {
        let r: ProcessImageResponse = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(r.success);
        assert!(r.records.is_empty());
    }

    #[test]
    fn file_result_uses_camel_case() {
        let r = FileResult {
            file_name: "a.jpg".into(),
            success: false,
            record_count: 0,
            error: Some("timeout".into()),
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["fileName"], "a.jpg");
        assert_eq!(json["recordCount"], 0);
        assert_eq!(json["error"], "timeout");
    }

    #[test]
    fn create_sheet_request_sheet_name_is_optional() {
        let r: CreateSheetRequest = serde_json::from_str(r#"{"records":[]}"#).unwrap();
        assert!(r.sheet_name.is_none());
    }

    #[test]
    fn default_title_contains_iso_date() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(default_sheet_title(d), "بيانات مستخرجة - 2025-03-07");
    }

    #[test]
    fn error_envelope_is_unsuccessful() {
        let json = serde_json::to_value(ErrorResponse::new("boom")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom");
    }
}
