use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use khatt_core::wire::ErrorResponse;
use khatt_core::IntakeError;
use khatt_extract::PipelineError;
use khatt_sheets::SheetsError;
use thiserror::Error;

/// Every handler failure, rendered as `{"success":false,"error":...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    UnsupportedMediaType(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{self}");
        } else {
            tracing::warn!(status = status.as_u16(), "{self}");
        }
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

impl From<IntakeError> for ApiError {
    fn from(e: IntakeError) -> Self {
        match e {
            IntakeError::TooLarge { .. } => ApiError::PayloadTooLarge(e.to_string()),
            IntakeError::BatchFull { .. } => ApiError::BadRequest(e.to_string()),
            IntakeError::Empty { .. } => ApiError::BadRequest(e.to_string()),
            _ => ApiError::UnsupportedMediaType(e.to_string()),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Intake(intake) => intake.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<SheetsError> for ApiError {
    fn from(e: SheetsError) -> Self {
        match e {
            SheetsError::InvalidUrl(_) => ApiError::BadRequest(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        let status = e.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(e.body_text())
        } else {
            ApiError::BadRequest(e.body_text())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intake_errors_map_to_client_statuses() {
        let too_large = ApiError::from(IntakeError::TooLarge {
            file_name: "a.png".into(),
            size: 11 * 1024 * 1024,
        });
        assert_eq!(too_large.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let wrong_type = ApiError::from(IntakeError::UnsupportedType {
            file_name: "a.gif".into(),
            mime: "image/gif".into(),
        });
        assert_eq!(wrong_type.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn bad_sheet_url_is_a_client_error() {
        let e = ApiError::from(SheetsError::InvalidUrl("nope".into()));
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn backend_failures_are_internal() {
        let e = ApiError::from(PipelineError::Backend(khatt_extract::BackendError::EmptyReply));
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
