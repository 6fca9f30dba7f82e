use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use khatt_core::wire::{
    default_sheet_title, AppendSheetRequest, AppendSheetResponse, CreateSheetRequest,
    CreateSheetResponse, ProcessImageResponse, ProcessImagesResponse,
};
use khatt_core::{ImageUpload, MAX_IMAGES_PER_BATCH};
use khatt_sheets::{spreadsheet_id_from_url, SheetExporter};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::ApiError;
use crate::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn process_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProcessImageResponse>, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let upload = read_uploads(multipart, "image", 1)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::BadRequest("No image file provided".into()))?;

    tracing::info!(file = %upload.file_name, bytes = upload.bytes.len(), "Processing image");
    let records = state.pipeline.process_upload(&upload).await?;
    tracing::info!(file = %upload.file_name, count = records.len(), "Image processed");

    Ok(Json(ProcessImageResponse { success: true, records, error: None }))
}

pub async fn process_images(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProcessImagesResponse>, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let uploads = read_uploads(multipart, "images", MAX_IMAGES_PER_BATCH).await?;
    if uploads.is_empty() {
        return Err(ApiError::BadRequest("No image files provided".into()));
    }

    tracing::info!(files = uploads.len(), "Processing batch");
    let batch = state.pipeline.process_batch(&uploads).await;
    let failed = batch.results.iter().filter(|r| !r.success).count();
    tracing::info!(
        files = uploads.len(),
        failed,
        records = batch.records.len(),
        "Batch processed"
    );

    Ok(Json(ProcessImagesResponse {
        success: true,
        records: batch.records,
        results: batch.results,
        error: None,
    }))
}

pub async fn create_sheet(
    State(state): State<AppState>,
    payload: Result<Json<CreateSheetRequest>, JsonRejection>,
) -> Result<Json<CreateSheetResponse>, ApiError> {
    let Json(req) = payload?;
    if req.records.is_empty() {
        return Err(ApiError::BadRequest("No records to export".into()));
    }
    let exporter = exporter(&state)?;

    let title = req
        .sheet_name
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_sheet_title(Utc::now().date_naive()));

    let created = exporter.create(&req.records, &title).await?;
    Ok(Json(CreateSheetResponse {
        success: true,
        sheet_url: Some(created.sheet_url),
        sheet_id: Some(created.sheet_id),
        error: None,
    }))
}

pub async fn append_sheet(
    State(state): State<AppState>,
    payload: Result<Json<AppendSheetRequest>, JsonRejection>,
) -> Result<Json<AppendSheetResponse>, ApiError> {
    let Json(req) = payload?;
    if req.records.is_empty() {
        return Err(ApiError::BadRequest("No records to export".into()));
    }
    if spreadsheet_id_from_url(&req.sheet_url).is_none() {
        return Err(ApiError::BadRequest(format!(
            "Not a spreadsheet URL: {}",
            req.sheet_url
        )));
    }
    let exporter = exporter(&state)?;

    let sheet_url = exporter.append(&req.records, &req.sheet_url).await?;
    Ok(Json(AppendSheetResponse { success: true, sheet_url: Some(sheet_url), error: None }))
}

fn exporter(state: &AppState) -> Result<Arc<dyn SheetExporter>, ApiError> {
    state
        .exporter
        .clone()
        .ok_or_else(|| ApiError::Unavailable("Google Sheets is not connected".into()))
}

/// Collect the file parts named `field`. Other parts are skipped. More than
/// `max` matching parts is a client error.
async fn read_uploads(
    mut multipart: Multipart,
    field: &str,
    max: usize,
) -> Result<Vec<ImageUpload>, ApiError> {
    let mut uploads = Vec::new();
    while let Some(part) = multipart.next_field().await? {
        if part.name() != Some(field) {
            continue;
        }
        if uploads.len() == max {
            return Err(ApiError::BadRequest(format!("At most {max} images per request")));
        }
        let file_name = part.file_name().unwrap_or("upload").to_string();
        let mime_type = part
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = part.bytes().await?;
        uploads.push(ImageUpload::new(file_name, mime_type, bytes.to_vec()));
    }
    Ok(uploads)
}
