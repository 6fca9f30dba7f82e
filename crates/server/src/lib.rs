//! HTTP service for image extraction and spreadsheet export.

pub mod error;
pub mod routes;
pub mod telemetry;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use khatt_core::{MAX_IMAGES_PER_BATCH, MAX_IMAGE_BYTES};
use khatt_extract::{ExtractionBackend, ExtractionPipeline};
use khatt_sheets::SheetExporter;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Room for multipart boundaries and part headers on top of the image bytes.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Body cap of `/api/process-image`.
pub const SINGLE_IMAGE_BODY_LIMIT: usize = MAX_IMAGE_BYTES + MULTIPART_OVERHEAD;

/// Body cap of `/api/process-images`.
pub const BATCH_BODY_LIMIT: usize = MAX_IMAGES_PER_BATCH * MAX_IMAGE_BYTES + MULTIPART_OVERHEAD;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ExtractionPipeline<Arc<dyn ExtractionBackend>>>,
    /// `None` when no spreadsheet credentials are configured; export routes
    /// then answer 503.
    pub exporter: Option<Arc<dyn SheetExporter>>,
}

impl AppState {
    pub fn new(
        backend: Arc<dyn ExtractionBackend>,
        exporter: Option<Arc<dyn SheetExporter>>,
    ) -> Self {
        Self {
            pipeline: Arc::new(ExtractionPipeline::new(backend)),
            exporter,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route(
            "/api/process-image",
            post(routes::process_image)
                .layer::<_, std::convert::Infallible>(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(SINGLE_IMAGE_BODY_LIMIT)),
        )
        .route(
            "/api/process-images",
            post(routes::process_images)
                .layer::<_, std::convert::Infallible>(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(BATCH_BODY_LIMIT)),
        )
        // JSON export bodies keep axum's default limit.
        .route("/api/create-sheet", post(routes::create_sheet))
        .route("/api/append-sheet", post(routes::append_sheet))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
