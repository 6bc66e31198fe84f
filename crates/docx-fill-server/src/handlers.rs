//! HTTP handlers.
//!
//! Implements:
//! - GET /api/health - Health check endpoint
//! - POST /api/parse - Upload a template and extract its placeholders
//! - POST /api/fill - Fill an uploaded template with answers
//! - DELETE /api/files/{id} - Forget an uploaded template

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use docx_fill_core::descriptor::{align_to_text, synthesize_keys};
use docx_fill_core::text::flatten_document;
use docx_fill_core::{fill, AnswerMap, Document, PlaceholderDescriptor, SubstitutionPlan};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::extractor::SharedExtractor;
use crate::session::{SharedSessionStore, UploadSession};

const DEFAULT_FILENAME: &str = "document.docx";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SharedSessionStore,
    pub extractor: SharedExtractor,
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
}

/// GET /api/health - Health check endpoint.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub file_id: String,
    pub file_name: String,
    pub placeholders: Vec<PlaceholderDescriptor>,
    pub text: String,
}

/// POST /api/parse - Upload a template (multipart field `file`).
///
/// The upload is only registered once the document parsed and extraction
/// succeeded.
pub async fn parse_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(DEFAULT_FILENAME)
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidRequest(e.body_text()))?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }
    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::InvalidRequest("missing 'file' field".to_string()))?;

    let text = flatten_document(&Document::open(&bytes)?);
    debug!("Parsed '{}': {} chars of text", file_name, text.len());

    let extracted = state.extractor.extract(&text).await?;
    let mut placeholders = align_to_text(extracted, &text)?;
    synthesize_keys(&mut placeholders);

    let session = UploadSession::new(bytes, file_name);
    let response = UploadResponse {
        file_id: session.id.clone(),
        file_name: session.original_filename.clone(),
        placeholders,
        text,
    };
    state.sessions.insert(session).await;

    info!(
        "Registered upload {} ('{}') with {} placeholders",
        response.file_id,
        response.file_name,
        response.placeholders.len()
    );
    Ok(Json(response))
}

/// Body of a fill request. All three fields are required.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillRequest {
    pub file_id: String,
    pub answers: AnswerMap,
    pub placeholders: Vec<PlaceholderDescriptor>,
}

impl FillRequest {
    fn validate(&self) -> Result<()> {
        if self.file_id.trim().is_empty() {
            return Err(AppError::InvalidRequest("fileId must not be blank".to_string()));
        }
        Ok(())
    }
}

/// POST /api/fill - Fill an uploaded template and return the new document.
pub async fn fill_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<FillRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    request.validate()?;

    let session = state
        .sessions
        .get(&request.file_id)
        .await
        .ok_or_else(|| AppError::UnknownFileId(request.file_id.clone()))?;

    let mut document = Document::open(&session.original_bytes)?;
    let plan = SubstitutionPlan::reconcile(&request.placeholders, &request.answers)?;
    debug!(
        "Fill plan for {}: {} literals, {} answered slots",
        session.id,
        plan.groups().len(),
        plan.answered()
    );
    let report = fill(&mut document, &plan);
    let bytes = document.serialize()?;

    info!(
        "Filled upload {} (uploaded {}s ago): {} replacements, {} bytes",
        session.id,
        (Utc::now() - session.created_at).num_seconds(),
        report.replacements,
        bytes.len()
    );

    let filename = format!("filled_{}", session.original_filename);
    let disposition = HeaderValue::from_str(&content_disposition(&filename))
        .map_err(|e| AppError::Internal(format!("Invalid header: {}", e)))?;

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// DELETE /api/files/{id} - Drop an upload before it expires.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<StatusCode> {
    if state.sessions.remove(&file_id).await {
        info!("Removed upload {}", file_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::UnknownFileId(file_id))
    }
}

/// `attachment` disposition with an ASCII fallback name and an RFC 5987
/// `filename*` for names outside printable ASCII.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    if fallback == filename {
        return format!("attachment; filename=\"{}\"", fallback);
    }

    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}
