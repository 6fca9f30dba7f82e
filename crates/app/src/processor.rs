use khatt_core::{ExtractedRecord, ImageStatus, ImageUpload};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::ClientError;
use crate::service::ExtractionService;

/// One uploaded image tracked through the workflow.
#[derive(Debug, Clone)]
pub struct ImageItem {
    pub id: String,
    pub upload: ImageUpload,
    pub preview_url: String,
    pub status: ImageStatus,
}

impl ImageItem {
    pub fn file_name(&self) -> &str {
        &self.upload.file_name
    }
}

/// Running counters published while a batch is in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchProgress {
    pub total: usize,
    pub processed: usize,
    pub successful: usize,
    pub errors: usize,
    /// File name of the item being processed, empty once the batch is done.
    pub current: String,
}

impl BatchProgress {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.processed as f64 / self.total as f64) * 100.0).round() as u8
    }

    pub fn is_done(&self) -> bool {
        self.processed == self.total
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub image_id: String,
    pub file_name: String,
    pub success: bool,
    pub record_count: usize,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<ItemOutcome>,
    /// Records of the successful items, in item order.
    pub records: Vec<ExtractedRecord>,
    pub progress: BatchProgress,
}

/// Sends items to the extraction service strictly one after another.
///
/// Each call is bounded by `timeout`; a failure or expiry marks only that item
/// as an error and the loop moves on, so every item ends in a terminal state.
pub struct BatchProcessor<'a, S: ?Sized> {
    service: &'a S,
    timeout: Duration,
    progress: Option<mpsc::Sender<BatchProgress>>,
}

impl<'a, S: ExtractionService + ?Sized> BatchProcessor<'a, S> {
    pub fn new(service: &'a S, timeout: Duration) -> Self {
        Self { service, timeout, progress: None }
    }

    /// Publish a snapshot after every state change. Snapshots are dropped
    /// when the receiver lags.
    pub fn with_progress(mut self, tx: mpsc::Sender<BatchProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    fn publish(&self, progress: &BatchProgress) {
        if let Some(tx) = &self.progress {
            let _ = tx.try_send(progress.clone());
        }
    }

    pub async fn run(&self, items: &mut [ImageItem]) -> BatchReport {
        let mut report = BatchReport {
            progress: BatchProgress { total: items.len(), ..Default::default() },
            ..Default::default()
        };
        self.publish(&report.progress);

        for item in items.iter_mut() {
            item.status = ImageStatus::Processing;
            report.progress.current = item.file_name().to_string();
            self.publish(&report.progress);
            tracing::info!(file = %item.file_name(), "Processing image");

            let call = self.service.extract(&item.upload);
            let result = match tokio::time::timeout(self.timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(ClientError::Timeout { after: self.timeout }),
            };

            let outcome = match result {
                Ok(records) => {
                    tracing::info!(
                        file = %item.file_name(),
                        count = records.len(),
                        "Image completed"
                    );
                    item.status = ImageStatus::Completed;
                    report.progress.successful += 1;
                    let count = records.len();
                    report.records.extend(records);
                    ItemOutcome {
                        image_id: item.id.clone(),
                        file_name: item.file_name().to_string(),
                        success: true,
                        record_count: count,
                        error: None,
                    }
                }
                Err(e) => {
                    tracing::warn!(file = %item.file_name(), "Image failed: {e}");
                    item.status = ImageStatus::Error;
                    report.progress.errors += 1;
                    ItemOutcome {
                        image_id: item.id.clone(),
                        file_name: item.file_name().to_string(),
                        success: false,
                        record_count: 0,
                        error: Some(e.to_string()),
                    }
                }
            };
            report.outcomes.push(outcome);
            report.progress.processed += 1;
            self.publish(&report.progress);
        }

        report.progress.current.clear();
        self.publish(&report.progress);
        report
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) enum Behaviour {
        Records(Vec<(&'static str, &'static str)>),
        Fail(&'static str),
        Hang,
    }

    /// Scripted per-file replies. Unknown files yield no records.
    #[derive(Default)]
    pub(crate) struct ScriptedService {
        pub(crate) script: HashMap<String, Behaviour>,
        pub(crate) calls: AtomicUsize,
        pub(crate) in_flight: AtomicUsize,
        pub(crate) max_in_flight: AtomicUsize,
    }

    impl ScriptedService {
        pub(crate) fn with(mut self, file: &str, behaviour: Behaviour) -> Self {
            self.script.insert(file.to_string(), behaviour);
            self
        }
    }

    #[async_trait]
    impl ExtractionService for ScriptedService {
        async fn extract(&self, upload: &ImageUpload) -> Result<Vec<ExtractedRecord>, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let result = match self.script.get(&upload.file_name) {
                Some(Behaviour::Records(rows)) => Ok(rows
                    .iter()
                    .map(|(name, id)| {
                        ExtractedRecord::new(name, id, Some(upload.file_name.clone()))
                    })
                    .collect()),
                Some(Behaviour::Fail(msg)) => Err(ClientError::Rejected(msg.to_string())),
                Some(Behaviour::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Vec::new())
                }
                None => Ok(Vec::new()),
            };
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    pub(crate) fn item(name: &str) -> ImageItem {
        ImageItem {
            id: format!("id-{name}"),
            upload: ImageUpload::new(name, "image/png", vec![0x89, b'P', b'N', b'G']),
            preview_url: format!("blob:khatt/{name}"),
            status: ImageStatus::Pending,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_item_is_isolated() {
        let service = ScriptedService::default()
            .with("1.png", Behaviour::Records(vec![("أحمد", "٢٩٠١٢٠١١٢٣٤٥٦٧")]))
            .with("2.png", Behaviour::Hang)
            .with("3.png", Behaviour::Records(vec![("منى", "29105021234568"), ("علي", "1")]));
        let mut items = vec![item("1.png"), item("2.png"), item("3.png")];

        let report = BatchProcessor::new(&service, Duration::from_secs(180))
            .run(&mut items)
            .await;

        assert_eq!(report.progress.processed, 3);
        assert_eq!(report.progress.successful, 2);
        assert_eq!(report.progress.errors, 1);
        assert_eq!(report.records.len(), 3);
        assert!(report
            .records
            .iter()
            .all(|r| r.source_image_id.as_deref() != Some("2.png")));
        assert_eq!(report.records[0].national_id, "29012011234567");

        assert_eq!(items[1].status, ImageStatus::Error);
        assert!(report.outcomes[1].error.as_deref().unwrap().contains("180"));
        assert!(items.iter().all(|i| i.status != ImageStatus::Processing));
    }

    #[tokio::test(start_paused = true)]
    async fn sub_second_timeout_is_reported_in_millis() {
        let service = ScriptedService::default().with("slow.png", Behaviour::Hang);
        let mut items = vec![item("slow.png")];

        let report = BatchProcessor::new(&service, Duration::from_millis(250))
            .run(&mut items)
            .await;

        assert_eq!(items[0].status, ImageStatus::Error);
        let error = report.outcomes[0].error.as_deref().unwrap();
        assert!(error.contains("250ms"), "{error}");
    }

    #[tokio::test]
    async fn every_item_reaches_a_terminal_state() {
        let failing = ["b.png", "d.png", "e.png"];
        let mut service = ScriptedService::default();
        for f in failing {
            service = service.with(f, Behaviour::Fail("bad image"));
        }
        let names = ["a.png", "b.png", "c.png", "d.png", "e.png", "f.png"];
        let mut items: Vec<_> = names.iter().map(|n| item(n)).collect();

        let report = BatchProcessor::new(&service, Duration::from_secs(5))
            .run(&mut items)
            .await;

        assert_eq!(report.progress.total, 6);
        assert_eq!(report.progress.successful, 3);
        assert_eq!(report.progress.errors, 3);
        assert!(items.iter().all(|i| i.status.is_terminal()));
        assert_eq!(service.calls.load(Ordering::SeqCst), 6);
        assert_eq!(service.max_in_flight.load(Ordering::SeqCst), 1);
        let failed: Vec<_> = report
            .outcomes
            .iter()
            .filter(|o| !o.success)
            .map(|o| o.file_name.as_str())
            .collect();
        assert_eq!(failed, failing);
    }

    #[tokio::test]
    async fn progress_snapshots_are_published() {
        let service = ScriptedService::default();
        let mut items = vec![item("a.png"), item("b.png")];
        let (tx, mut rx) = mpsc::channel(32);

        BatchProcessor::new(&service, Duration::from_secs(5))
            .with_progress(tx)
            .run(&mut items)
            .await;

        let mut snapshots = Vec::new();
        while let Ok(p) = rx.try_recv() {
            snapshots.push(p);
        }
        assert_eq!(snapshots.first().map(|p| p.processed), Some(0));
        assert!(snapshots.iter().any(|p| p.current == "b.png"));
        let last = snapshots.last().unwrap();
        assert!(last.is_done());
        assert_eq!(last.percent(), 100);
        assert!(last.current.is_empty());
    }

    #[test]
    fn percent_rounds() {
        let p = BatchProgress { total: 3, processed: 1, ..Default::default() };
        assert_eq!(p.percent(), 33);
        let p = BatchProgress { total: 3, processed: 2, ..Default::default() };
        assert_eq!(p.percent(), 67);
        assert_eq!(BatchProgress::default().percent(), 0);
    }
}
