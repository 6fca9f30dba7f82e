use anyhow::Context;
use khatt_core::Config;
use khatt_extract::{ExtractionBackend, GeminiBackend};
use khatt_server::{router, telemetry, AppState};
use khatt_sheets::{exporter_from_settings, SheetExporter};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init("khatt-server");

    let explicit = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::discover(explicit.as_deref()).context("Failed to load configuration")?;

    let backend: Arc<dyn ExtractionBackend> = Arc::new(
        GeminiBackend::from_settings(&config.extraction)
            .context("Gemini extraction backend is not configured")?,
    );
    tracing::info!(model = %config.extraction.model, "Extraction backend ready");

    let exporter: Option<Arc<dyn SheetExporter>> = match exporter_from_settings(&config.sheets) {
        Ok(exporter) => Some(Arc::new(exporter)),
        Err(e) => {
            tracing::warn!("Spreadsheet export disabled: {e}");
            None
        }
    };

    let app = router(AppState::new(backend, exporter));
    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    tracing::info!(addr = %config.server.bind, "Server listening");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
