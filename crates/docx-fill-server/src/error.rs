//! Error types for the HTTP service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::extractor::ExtractError;

/// Request-level failures. None of them carries a partial document.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unknown file id: {0}")]
    UnknownFileId(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Extraction protocol error: {0}")]
    ExtractionProtocol(String),

    #[error("Extraction service unavailable: {0}")]
    ExtractionUnavailable(String),

    #[error("Extraction service timed out")]
    ExtractionTimeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<docx_fill_core::Error> for AppError {
    fn from(err: docx_fill_core::Error) -> Self {
        match err {
            docx_fill_core::Error::MalformedDocument(msg) => AppError::MalformedDocument(msg),
            docx_fill_core::Error::ExtractionProtocol(msg) => AppError::ExtractionProtocol(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Timeout => AppError::ExtractionTimeout,
            ExtractError::Unavailable(msg) => AppError::ExtractionUnavailable(msg),
            ExtractError::Protocol(inner) => inner.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorBody {
            error: String,
            code: &'static str,
        }

        let (status, code) = match &self {
            AppError::UnknownFileId(_) => (StatusCode::NOT_FOUND, "UNKNOWN_FILE_ID"),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            AppError::MalformedDocument(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "MALFORMED_DOCUMENT")
            }
            AppError::ExtractionProtocol(_) => (StatusCode::BAD_GATEWAY, "EXTRACTION_PROTOCOL"),
            AppError::ExtractionUnavailable(_) => {
                (StatusCode::BAD_GATEWAY, "EXTRACTION_UNAVAILABLE")
            }
            AppError::ExtractionTimeout => (StatusCode::GATEWAY_TIMEOUT, "EXTRACTION_TIMEOUT"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorBody {
            error: self.to_string(),
            code,
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
