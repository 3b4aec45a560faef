//! crates/quizforge_core/src/ingestion.rs
//!
//! The document ingestion pipeline: accepts an upload, persists a pending
//! record, and runs the asynchronous worker body that stores the raw bytes,
//! extracts text and drives the document through its status machine.
//!
//! The pipeline holds its collaborators explicitly; nothing here touches
//! global state. Scheduling (queue + worker pool) belongs to the caller:
//! `submit` hands back an [`IngestJob`] and the host decides where it runs.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{Document, DocumentStatus, ExtractedText, FileFormat};
use crate::ports::{
    DatabaseService, ObjectStoreService, PortError, PortResult, TextExtractionService,
};

/// A unit of background work produced by [`IngestionPipeline::submit`].
/// Carries everything the worker needs so it never re-reads the upload.
#[derive(Debug)]
pub struct IngestJob {
    pub document_id: Uuid,
    pub owner_id: Uuid,
    pub filename: String,
    pub format: FileFormat,
    pub content: Vec<u8>,
}

/// Turns uploaded documents into extracted text, tracking progress through
/// the document status machine.
pub struct IngestionPipeline {
    db: Arc<dyn DatabaseService>,
    store: Arc<dyn ObjectStoreService>,
    extractor: Arc<dyn TextExtractionService>,
}

impl IngestionPipeline {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        store: Arc<dyn ObjectStoreService>,
        extractor: Arc<dyn TextExtractionService>,
    ) -> Self {
        Self {
            db,
            store,
            extractor,
        }
    }

    /// Accepts an upload: validates the extension, writes the pending record
    /// and returns it together with the job for the background worker.
    ///
    /// Returns `UnsupportedFormat` for extensions outside the accepted set
    /// and `Persistence` if the initial record cannot be written.
    pub async fn submit(
        &self,
        owner_id: Uuid,
        filename: &str,
        content: Vec<u8>,
    ) -> PortResult<(Document, IngestJob)> {
        let format = FileFormat::from_filename(filename)
            .ok_or_else(|| PortError::UnsupportedFormat(filename.to_string()))?;

        let document = Document {
            id: Uuid::new_v4(),
            owner_id,
            filename: filename.to_string(),
            byte_size: content.len() as i64,
            status: DocumentStatus::Pending,
            storage_location: None,
            error_message: None,
            uploaded_at: Utc::now(),
        };

        self.db.insert_document(&document).await?;
        info!(document_id = %document.id, filename, "accepted upload");

        let job = IngestJob {
            document_id: document.id,
            owner_id,
            filename: filename.to_string(),
            format,
            content,
        };

        Ok((document, job))
    }

    /// The worker body. Failures in storage or extraction end in the
    /// terminal `failed` state with a recorded message; nothing is raised
    /// past this boundary and no retry is attempted.
    pub async fn process(&self, job: IngestJob) {
        if let Err(e) = self.run_job(&job).await {
            error!(document_id = %job.document_id, error = %e, "ingestion failed");
            self.record_failure(job.document_id, &e.to_string()).await;
        }
    }

    async fn run_job(&self, job: &IngestJob) -> PortResult<()> {
        if !self.db.mark_document_processing(job.document_id).await? {
            // Not in `pending` anymore; a terminal state must not regress.
            warn!(document_id = %job.document_id, "skipping job, document no longer pending");
            return Ok(());
        }

        let storage_location = storage_path(job.owner_id, job.document_id, &job.filename);
        self.store
            .put(&storage_location, &job.content, job.format.content_type())
            .await?;

        let text = self.extractor.extract(job.format, &job.content).await?;

        self.db
            .insert_extracted_text(&ExtractedText {
                document_id: job.document_id,
                text,
                page_number: 1,
            })
            .await?;

        self.db
            .mark_document_completed(job.document_id, &storage_location)
            .await?;
        info!(document_id = %job.document_id, %storage_location, "ingestion completed");
        Ok(())
    }

    /// Marks a document terminally failed. Best-effort: the worker has no
    /// caller to report to, so a failed write is only logged.
    pub async fn record_failure(&self, document_id: Uuid, message: &str) {
        if let Err(e) = self.db.mark_document_failed(document_id, message).await {
            error!(%document_id, error = %e, "could not record ingestion failure");
        }
    }

    /// Current state of a document. `NotFound` covers both a missing id and
    /// a document owned by someone else.
    pub async fn status(&self, document_id: Uuid, owner_id: Uuid) -> PortResult<Document> {
        self.db.get_document(document_id, owner_id).await
    }

    /// All of an owner's documents, newest first.
    pub async fn list(&self, owner_id: Uuid) -> PortResult<Vec<Document>> {
        self.db.list_documents(owner_id).await
    }

    /// Removes a document, its stored object and (by cascade) its extracted
    /// text. The record is deleted last; if the object removal fails the
    /// orphaned object is logged and deletion continues.
    pub async fn delete(&self, document_id: Uuid, owner_id: Uuid) -> PortResult<()> {
        let document = self.db.get_document(document_id, owner_id).await?;

        if let Some(location) = &document.storage_location {
            if let Err(e) = self.store.remove(location).await {
                warn!(%document_id, path = %location, error = %e, "orphaned object: removal failed");
            }
        }

        self.db.delete_document(document_id, owner_id).await?;
        info!(%document_id, "document deleted");
        Ok(())
    }
}

/// Deterministic object-store path for a document's raw bytes. Embedding the
/// owner and document ids keeps concurrent uploads from ever colliding.
pub fn storage_path(owner_id: Uuid, document_id: Uuid, filename: &str) -> String {
    format!("{owner_id}/{document_id}/{filename}")
}
