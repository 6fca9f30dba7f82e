use async_trait::async_trait;
use khatt_core::{ExtractedRecord, ImageUpload};
use khatt_extract::{ExtractionBackend, ExtractionPipeline};
use khatt_sheets::SheetExporter;

use crate::error::ClientError;

/// A spreadsheet produced by a "create new" export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedSheet {
    pub sheet_url: String,
    pub sheet_id: Option<String>,
}

/// Turns one image into records. The batch processor calls this once per item.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    async fn extract(&self, upload: &ImageUpload) -> Result<Vec<ExtractedRecord>, ClientError>;
}

#[async_trait]
pub trait ExportService: Send + Sync {
    async fn create_sheet(
        &self,
        records: &[ExtractedRecord],
        title: &str,
    ) -> Result<ExportedSheet, ClientError>;

    /// Returns the URL of the spreadsheet the rows landed in.
    async fn append_sheet(
        &self,
        records: &[ExtractedRecord],
        sheet_url: &str,
    ) -> Result<String, ClientError>;
}

/// Runs the extraction pipeline in-process instead of through the server.
pub struct LocalExtraction<B: ExtractionBackend> {
    pipeline: ExtractionPipeline<B>,
}

impl<B: ExtractionBackend> LocalExtraction<B> {
    pub fn new(backend: B) -> Self {
        Self { pipeline: ExtractionPipeline::new(backend) }
    }
}

#[async_trait]
impl<B: ExtractionBackend> ExtractionService for LocalExtraction<B> {
    async fn extract(&self, upload: &ImageUpload) -> Result<Vec<ExtractedRecord>, ClientError> {
        self.pipeline
            .process_upload(upload)
            .await
            .map_err(|e| ClientError::Local(e.to_string()))
    }
}

/// Talks to Google Sheets directly instead of through the server.
pub struct LocalExport<E: SheetExporter> {
    exporter: E,
}

impl<E: SheetExporter> LocalExport<E> {
    pub fn new(exporter: E) -> Self {
        Self { exporter }
    }
}

#[async_trait]
impl<E: SheetExporter> ExportService for LocalExport<E> {
    async fn create_sheet(
        &self,
        records: &[ExtractedRecord],
        title: &str,
    ) -> Result<ExportedSheet, ClientError> {
        let created = self
            .exporter
            .create(records, title)
            .await
            .map_err(|e| ClientError::Local(e.to_string()))?;
        Ok(ExportedSheet { sheet_url: created.sheet_url, sheet_id: Some(created.sheet_id) })
    }

    async fn append_sheet(
        &self,
        records: &[ExtractedRecord],
        sheet_url: &str,
    ) -> Result<String, ClientError> {
        self.exporter
            .append(records, sheet_url)
            .await
            .map_err(|e| ClientError::Local(e.to_string()))
    }
}
