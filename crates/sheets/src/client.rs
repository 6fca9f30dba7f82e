use reqwest::{Method, Url};
use serde_json::Value;
use thiserror::Error;

use crate::token::{TokenError, TokenSource};

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("{0}")]
    Token(#[from] TokenError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Sheets API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Sheets API response missing {0}")]
    MissingField(&'static str),
    #[error("Not a spreadsheet URL: {0}")]
    InvalidUrl(String),
}

/// The spreadsheet created by [`SheetsClient::create_spreadsheet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSpreadsheet {
    pub spreadsheet_id: String,
    /// Numeric id of the single tab, needed for formatting requests.
    pub tab_id: i64,
}

/// Thin client over the Sheets v4 REST endpoints used for export.
pub struct SheetsClient<T> {
    http: reqwest::Client,
    api_base: Url,
    tokens: T,
}

impl<T: TokenSource> SheetsClient<T> {
    pub fn new(api_base: &str, tokens: T) -> Result<Self, SheetsError> {
        let api_base =
            Url::parse(api_base).map_err(|_| SheetsError::InvalidUrl(api_base.to_string()))?;
        Ok(Self { http: reqwest::Client::new(), api_base, tokens })
    }

    /// `{base}/v4/spreadsheets[/<segment>...]`, each segment percent-encoded.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["v4", "spreadsheets"]).extend(segments);
        }
        url
    }

    async fn call(&self, method: Method, url: Url, body: &Value) -> Result<Value, SheetsError> {
        // Fetched per call so an expired token is never reused.
        let token = self.tokens.access_token().await?;
        let resp = self
            .http
            .request(method, url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let payload: Value = resp.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message: api_error_message(&payload),
            });
        }
        Ok(payload)
    }

    pub async fn create_spreadsheet(
        &self,
        title: &str,
        tab_title: &str,
    ) -> Result<NewSpreadsheet, SheetsError> {
        let body = serde_json::json!({
            "properties": { "title": title, "locale": "ar" },
            "sheets": [{
                "properties": {
                    "title": tab_title,
                    "rightToLeft": true,
                    "gridProperties": { "frozenRowCount": 1 }
                }
            }]
        });
        let resp = self.call(Method::POST, self.endpoint(&[]), &body).await?;

        let spreadsheet_id = resp
            .get("spreadsheetId")
            .and_then(Value::as_str)
            .ok_or(SheetsError::MissingField("spreadsheetId"))?
            .to_string();
        let tab_id = resp
            .pointer("/sheets/0/properties/sheetId")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(NewSpreadsheet { spreadsheet_id, tab_id })
    }

    /// Overwrite cells starting at `range`.
    pub async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), SheetsError> {
        let mut url = self.endpoint(&[spreadsheet_id, "values", range]);
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        self.call(Method::PUT, url, &serde_json::json!({ "values": values }))
            .await?;
        Ok(())
    }

    /// Add rows after the last row of the table found in `range`.
    pub async fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), SheetsError> {
        let mut url = self.endpoint(&[spreadsheet_id, "values", &format!("{range}:append")]);
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        self.call(Method::POST, url, &serde_json::json!({ "values": values }))
            .await?;
        Ok(())
    }

    pub async fn batch_update(
        &self,
        spreadsheet_id: &str,
        requests: Value,
    ) -> Result<(), SheetsError> {
        let url = self.endpoint(&[&format!("{spreadsheet_id}:batchUpdate")]);
        self.call(Method::POST, url, &serde_json::json!({ "requests": requests }))
            .await?;
        Ok(())
    }
}

/// Google wraps failures as `{"error":{"message":...}}`.
fn api_error_message(payload: &Value) -> String {
    payload
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| "unknown error".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NoTokens;

    #[async_trait]
    impl TokenSource for NoTokens {
        async fn access_token(&self) -> Result<String, TokenError> {
            Err(TokenError::NotConfigured)
        }
    }

    fn client() -> SheetsClient<NoTokens> {
        SheetsClient::new("https://sheets.example.com", NoTokens).unwrap()
    }

    #[test]
    fn endpoint_builds_collection_url() {
        assert_eq!(
            client().endpoint(&[]).as_str(),
            "https://sheets.example.com/v4/spreadsheets"
        );
    }

    #[test]
    fn endpoint_encodes_arabic_range() {
        let url = client().endpoint(&["abc", "values", "'البيانات المستخرجة'!A1"]);
        let s = url.as_str();
        assert!(s.starts_with("https://sheets.example.com/v4/spreadsheets/abc/values/"));
        assert!(!s.contains(' '));
        assert!(s.ends_with("!A1"));
    }

    #[test]
    fn batch_update_suffix_is_kept() {
        let url = client().endpoint(&["abc:batchUpdate"]);
        assert_eq!(url.as_str(), "https://sheets.example.com/v4/spreadsheets/abc:batchUpdate");
    }

    #[test]
    fn invalid_base_is_rejected() {
        assert!(matches!(
            SheetsClient::new("not a url", NoTokens),
            Err(SheetsError::InvalidUrl(_))
        ));
    }

    #[test]
    fn api_error_message_extracted() {
        let payload = serde_json::json!({ "error": { "code": 403, "message": "denied" } });
        assert_eq!(api_error_message(&payload), "denied");
        assert_eq!(api_error_message(&Value::Null), "unknown error");
    }

    #[tokio::test]
    async fn token_failure_surfaces_before_any_request() {
        let err = client().create_spreadsheet("t", "tab").await.unwrap_err();
        assert!(matches!(err, SheetsError::Token(TokenError::NotConfigured)));
    }
}
