//! Workflow controller for the khatt extraction app: intake, sequential
//! processing, review and export, independent of any front end.

pub mod error;
pub mod http;
pub mod preview;
pub mod processor;
pub mod review;
pub mod service;
pub mod session;

pub use error::{ClientError, ExportError};
pub use http::HttpClient;
pub use preview::PreviewUrls;
pub use processor::{BatchProcessor, BatchProgress, BatchReport, ImageItem, ItemOutcome};
pub use service::{ExportService, ExportedSheet, ExtractionService, LocalExport, LocalExtraction};
pub use session::{ExportMode, IntakeReport, Phase, Session, SessionStats};
