use async_trait::async_trait;
use khatt_core::wire::{
    AppendSheetRequest, AppendSheetResponse, CreateSheetRequest, CreateSheetResponse,
    ProcessImageResponse,
};
use khatt_core::{ExtractedRecord, ImageUpload};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;

use crate::error::ClientError;
use crate::service::{ExportService, ExportedSheet, ExtractionService};

/// Client for the khatt HTTP service.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http: reqwest::Client::new(), base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Decode the JSON body whatever the status, so error envelopes keep
    /// their message.
    async fn read<T: DeserializeOwned>(resp: reqwest::Response) -> Result<(u16, T), ClientError> {
        let status = resp.status().as_u16();
        let text = resp.text().await?;
        match serde_json::from_str(&text) {
            Ok(body) => Ok((status, body)),
            Err(_) => Err(ClientError::Server {
                status,
                message: text.chars().take(200).collect(),
            }),
        }
    }
}

fn failure(status: u16, error: Option<String>, fallback: &str) -> ClientError {
    let message = error.unwrap_or_else(|| fallback.to_string());
    if (200..300).contains(&status) {
        ClientError::Rejected(message)
    } else {
        ClientError::Server { status, message }
    }
}

#[async_trait]
impl ExtractionService for HttpClient {
    async fn extract(&self, upload: &ImageUpload) -> Result<Vec<ExtractedRecord>, ClientError> {
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type)?;
        let form = Form::new().part("image", part);

        let resp = self
            .http
            .post(self.url("/api/process-image"))
            .multipart(form)
            .send()
            .await?;
        let (status, body): (u16, ProcessImageResponse) = Self::read(resp).await?;

        // A successful reply without records still counts as completed.
        if body.success && (200..300).contains(&status) {
            Ok(body.records)
        } else {
            Err(failure(status, body.error, "Image processing failed"))
        }
    }
}

#[async_trait]
impl ExportService for HttpClient {
    async fn create_sheet(
        &self,
        records: &[ExtractedRecord],
        title: &str,
    ) -> Result<ExportedSheet, ClientError> {
        let req = CreateSheetRequest {
            records: records.to_vec(),
            sheet_name: Some(title.to_string()),
        };
        let resp = self.http.post(self.url("/api/create-sheet")).json(&req).send().await?;
        let (status, body): (u16, CreateSheetResponse) = Self::read(resp).await?;

        match body.sheet_url {
            Some(sheet_url) if body.success => {
                Ok(ExportedSheet { sheet_url, sheet_id: body.sheet_id })
            }
            _ => Err(failure(status, body.error, "Failed to create Google Sheet")),
        }
    }

    async fn append_sheet(
        &self,
        records: &[ExtractedRecord],
        sheet_url: &str,
    ) -> Result<String, ClientError> {
        let req = AppendSheetRequest {
            records: records.to_vec(),
            sheet_url: sheet_url.to_string(),
        };
        let resp = self.http.post(self.url("/api/append-sheet")).json(&req).send().await?;
        let (status, body): (u16, AppendSheetResponse) = Self::read(resp).await?;

        match body.sheet_url {
            Some(url) if body.success => Ok(url),
            _ => Err(failure(status, body.error, "Failed to append to Google Sheet")),
        }
    }
}
