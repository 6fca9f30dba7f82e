use khatt_core::wire::FileResult;
use khatt_core::{ExtractedRecord, ImageUpload, IntakeError};
use thiserror::Error;

use crate::backend::{BackendError, ExtractionBackend};
use crate::parse::{self, ParseError};
use crate::prepare::{self, PrepareError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Upload rejected: {0}")]
    Intake(#[from] IntakeError),
    #[error("Image preparation failed: {0}")]
    Prepare(#[from] PrepareError),
    #[error("Extraction request failed: {0}")]
    Backend(#[from] BackendError),
    #[error("Could not read model reply: {0}")]
    Parse(#[from] ParseError),
}

/// Records from a multi-file request plus one result line per file.
#[derive(Debug, Default)]
pub struct BatchExtraction {
    pub records: Vec<ExtractedRecord>,
    pub results: Vec<FileResult>,
}

/// Orchestrates: validate → prepare → model call → parse → normalize.
pub struct ExtractionPipeline<B: ExtractionBackend> {
    backend: B,
}

impl<B: ExtractionBackend> ExtractionPipeline<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Extract the records of a single uploaded image.
    pub async fn process_upload(
        &self,
        upload: &ImageUpload,
    ) -> Result<Vec<ExtractedRecord>, PipelineError> {
        // 1. Type and size checks.
        let kind = upload.validate()?;

        // 2. Decode / downscale.
        let prepared = prepare::prepare_for_extraction(upload, kind)?;

        // 3. Ask the model.
        let reply = self.backend.generate(&prepared).await?;

        // 4. Parse and clean.
        let records = parse::parse_reply(&reply)?
            .into_iter()
            .map(|raw| {
                ExtractedRecord::new(&raw.name, &raw.national_id, Some(upload.file_name.clone()))
            })
            .collect();

        Ok(records)
    }

    /// Process uploads one after another. A failing file is reported in its
    /// result line and does not stop the rest.
    pub async fn process_batch(&self, uploads: &[ImageUpload]) -> BatchExtraction {
        let mut batch = BatchExtraction::default();
        for upload in uploads {
            match self.process_upload(upload).await {
                Ok(records) => {
                    tracing::info!(
                        file = %upload.file_name,
                        count = records.len(),
                        "Image processed"
                    );
                    batch.results.push(FileResult {
                        file_name: upload.file_name.clone(),
                        success: true,
                        record_count: records.len(),
                        error: None,
                    });
                    batch.records.extend(records);
                }
                Err(e) => {
                    tracing::warn!(file = %upload.file_name, "Image processing failed: {e}");
                    batch.results.push(FileResult {
                        file_name: upload.file_name.clone(),
                        success: false,
                        record_count: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        batch
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
