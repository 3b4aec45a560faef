//! services/api/src/web/files.rs
//!
//! Upload, status, listing and deletion endpoints for documents. The upload
//! handler writes the pending record and enqueues the background job; every
//! later state is observed by polling the status endpoint.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use quizforge_core::domain::Document;

use crate::error::ApiError;
use crate::web::state::AppState;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The wire representation of a document and its processing state.
#[derive(Serialize, ToSchema)]
pub struct FileResponse {
    pub id: Uuid,
    pub filename: String,
    pub status: String,
    pub uploaded_at: DateTime<Utc>,
    /// Empty unless processing failed.
    pub error_message: String,
    pub size: i64,
}

impl From<Document> for FileResponse {
    fn from(document: Document) -> Self {
        Self {
            id: document.id,
            filename: document.filename,
            status: document.status.as_str().to_string(),
            uploaded_at: document.uploaded_at,
            error_message: document.error_message.unwrap_or_default(),
            size: document.byte_size,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Upload a PDF or PPT file for processing.
///
/// Accepts a multipart/form-data request with a single file part. The
/// response carries the pending record; processing happens in the background.
#[utoipa::path(
    post,
    path = "/files/upload",
    request_body(content_type = "multipart/form-data", description = "The document to upload."),
    responses(
        (status = 201, description = "Upload accepted, processing scheduled", body = FileResponse),
        (status = 400, description = "Unsupported file type or malformed request"),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn upload_file_handler(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart data: {e}")))?
        .ok_or_else(|| ApiError::BadRequest("Multipart form must include a file".to_string()))?;

    let filename = field
        .file_name()
        .ok_or_else(|| ApiError::BadRequest("File part must carry a filename".to_string()))?
        .to_string();
    let content = field
        .bytes()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read file bytes: {e}")))?
        .to_vec();

    let (document, job) = state.pipeline.submit(user_id, &filename, content).await?;

    if state.ingest.enqueue(job).await.is_err() {
        // Don't strand the record in `pending` when no worker will ever run.
        error!(document_id = %document.id, "ingestion queue unavailable");
        state
            .pipeline
            .record_failure(document.id, "ingestion queue unavailable")
            .await;
        return Err(ApiError::Internal(
            "ingestion queue unavailable".to_string(),
        ));
    }

    Ok((StatusCode::CREATED, Json(FileResponse::from(document))))
}

/// Check the processing status of a file.
#[utoipa::path(
    get,
    path = "/files/{file_id}/status",
    params(("file_id" = Uuid, Path, description = "The document's id")),
    responses(
        (status = 200, description = "Current state of the document", body = FileResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No such document for this user")
    )
)]
pub async fn file_status_handler(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Path(file_id): Path<Uuid>,
) -> Result<Json<FileResponse>, ApiError> {
    let document = state.pipeline.status(file_id, user_id).await?;
    Ok(Json(FileResponse::from(document)))
}

/// List all uploaded files for the current user, newest first.
#[utoipa::path(
    get,
    path = "/files",
    responses(
        (status = 200, description = "The user's documents", body = [FileResponse]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_files_handler(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<FileResponse>>, ApiError> {
    let documents = state.pipeline.list(user_id).await?;
    Ok(Json(documents.into_iter().map(FileResponse::from).collect()))
}

/// Delete a file and its associated data.
#[utoipa::path(
    delete,
    path = "/files/{file_id}",
    params(("file_id" = Uuid, Path, description = "The document's id")),
    responses(
        (status = 204, description = "Document, stored object and extracted text removed"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No such document for this user")
    )
)]
pub async fn delete_file_handler(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Path(file_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.pipeline.delete(file_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
