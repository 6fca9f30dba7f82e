use chrono::Local;
use khatt_core::wire::default_sheet_title;
use khatt_core::{
    ImageStatus, ImageUpload, IntakeError, RecordId, RecordSet, MAX_IMAGES_PER_BATCH,
};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::ExportError;
use crate::preview::PreviewUrls;
use crate::processor::{BatchProcessor, BatchProgress, BatchReport, ImageItem};
use crate::service::{ExportService, ExtractionService};

/// Which screen of the workflow the session is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Upload,
    Preview,
    Processing,
    Results,
    SheetCreated,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Upload => write!(f, "upload"),
            Phase::Preview => write!(f, "preview"),
            Phase::Processing => write!(f, "processing"),
            Phase::Results => write!(f, "results"),
            Phase::SheetCreated => write!(f, "sheet_created"),
        }
    }
}

#[derive(Debug, Default)]
pub struct IntakeReport {
    /// Ids of the items created, in input order.
    pub accepted: Vec<String>,
    pub rejected: Vec<IntakeError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportMode {
    /// `None` uses the dated default title.
    CreateNew { title: Option<String> },
    AppendTo { sheet_url: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub images: usize,
    pub completed: usize,
    pub errors: usize,
    pub records: usize,
    /// Records whose national ID is not 14 digits.
    pub suspicious: usize,
}

/// All in-memory state of one upload → review → export run.
#[derive(Debug)]
pub struct Session {
    phase: Phase,
    items: Vec<ImageItem>,
    records: RecordSet,
    previews: PreviewUrls,
    sheet_url: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            phase: Phase::Upload,
            items: Vec::new(),
            records: RecordSet::new(),
            previews: PreviewUrls::new(),
            sheet_url: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn items(&self) -> &[ImageItem] {
        &self.items
    }

    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    pub fn previews(&self) -> &PreviewUrls {
        &self.previews
    }

    pub fn sheet_url(&self) -> Option<&str> {
        self.sheet_url.as_deref()
    }

    /// Validate and queue files. Files past the batch capacity and files
    /// failing validation are reported, the rest become pending items.
    pub fn add_files(&mut self, files: impl IntoIterator<Item = ImageUpload>) -> IntakeReport {
        let mut report = IntakeReport::default();
        for upload in files {
            if self.items.len() >= MAX_IMAGES_PER_BATCH {
                report.rejected.push(IntakeError::BatchFull { file_name: upload.file_name });
                continue;
            }
            if let Err(e) = upload.validate() {
                report.rejected.push(e);
                continue;
            }
            let item = ImageItem {
                id: uuid::Uuid::new_v4().to_string(),
                preview_url: self.previews.issue(),
                upload,
                status: ImageStatus::Pending,
            };
            report.accepted.push(item.id.clone());
            self.items.push(item);
        }

        if !report.accepted.is_empty() {
            self.phase = Phase::Preview;
        }
        tracing::info!(
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            "Files added"
        );
        report
    }

    pub fn remove(&mut self, image_id: &str) -> bool {
        let Some(idx) = self.items.iter().position(|i| i.id == image_id) else {
            return false;
        };
        let item = self.items.remove(idx);
        self.previews.release(&item.preview_url);
        if self.items.is_empty() {
            self.phase = Phase::Upload;
        }
        true
    }

    pub fn remove_all(&mut self) {
        for item in self.items.drain(..) {
            self.previews.release(&item.preview_url);
        }
        self.phase = Phase::Upload;
    }

    /// Drop images, records and the export result.
    pub fn reset(&mut self) {
        self.remove_all();
        self.records.clear();
        self.sheet_url = None;
    }

    /// Run every queued image through `service`, one at a time, and replace
    /// the working record set with what they yield.
    pub async fn process<S: ExtractionService + ?Sized>(
        &mut self,
        service: &S,
        timeout: Duration,
        progress: Option<mpsc::Sender<BatchProgress>>,
    ) -> BatchReport {
        if self.items.is_empty() {
            return BatchReport::default();
        }

        self.phase = Phase::Processing;
        for item in &mut self.items {
            item.status = ImageStatus::Pending;
        }

        let mut processor = BatchProcessor::new(service, timeout);
        if let Some(tx) = progress {
            processor = processor.with_progress(tx);
        }
        let report = processor.run(&mut self.items).await;

        let mut records = RecordSet::new();
        records.extend(report.records.iter().cloned());
        self.records = records;
        self.sheet_url = None;
        self.phase = Phase::Results;

        tracing::info!(
            records = self.records.len(),
            successful = report.progress.successful,
            errors = report.progress.errors,
            "Batch finished"
        );
        report
    }

    pub fn edit(&mut self, id: &RecordId, name: &str, national_id: &str) -> bool {
        self.records.edit(id, name, national_id)
    }

    pub fn delete(&mut self, id: &RecordId) -> bool {
        self.records.delete(id)
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            images: self.items.len(),
            completed: self
                .items
                .iter()
                .filter(|i| i.status == ImageStatus::Completed)
                .count(),
            errors: self
                .items
                .iter()
                .filter(|i| i.status == ImageStatus::Error)
                .count(),
            records: self.records.len(),
            suspicious: self.records.suspicious_count(),
        }
    }

    /// Send the current records to the spreadsheet service once. On failure
    /// the session is left as it was.
    pub async fn export<S: ExportService + ?Sized>(
        &mut self,
        service: &S,
        mode: ExportMode,
    ) -> Result<String, ExportError> {
        if self.records.is_empty() {
            return Err(ExportError::Empty);
        }

        let sheet_url = match mode {
            ExportMode::CreateNew { title } => {
                let title = title
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| default_sheet_title(Local::now().date_naive()));
                service.create_sheet(self.records.as_slice(), &title).await?.sheet_url
            }
            ExportMode::AppendTo { sheet_url } => {
                service.append_sheet(self.records.as_slice(), sheet_url.trim()).await?
            }
        };

        tracing::info!(url = %sheet_url, rows = self.records.len(), "Export finished");
        self.sheet_url = Some(sheet_url.clone());
        self.phase = Phase::SheetCreated;
        Ok(sheet_url)
    }
}
