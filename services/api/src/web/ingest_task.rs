//! services/api/src/web/ingest_task.rs
//!
//! The background half of the ingestion pipeline: a bounded queue feeding a
//! pool of worker tasks. Uploads enqueue an `IngestJob` and return; workers
//! drain the queue and drive each document through processing. An explicit
//! queue (rather than a detached task per upload) keeps the number of
//! in-flight extractions bounded and observable.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::info;

use quizforge_core::ingestion::{IngestJob, IngestionPipeline};

/// How many submitted-but-unprocessed jobs the queue holds before uploads
/// start waiting for a worker to catch up.
const QUEUE_CAPACITY: usize = 64;

/// Producer handle to the ingestion queue, cloned into the shared state.
#[derive(Clone)]
pub struct IngestQueue {
    tx: mpsc::Sender<IngestJob>,
}

impl IngestQueue {
    /// Hands a job to the worker pool. Fails only if every worker is gone.
    pub async fn enqueue(&self, job: IngestJob) -> Result<(), IngestJob> {
        self.tx.send(job).await.map_err(|e| e.0)
    }
}

/// Spawns `workers` ingestion workers sharing one queue and returns the
/// producer handle.
pub fn spawn_ingest_workers(pipeline: Arc<IngestionPipeline>, workers: usize) -> IngestQueue {
    let (tx, rx) = mpsc::channel::<IngestJob>(QUEUE_CAPACITY);
    let rx = Arc::new(Mutex::new(rx));

    for worker_id in 0..workers {
        let pipeline = pipeline.clone();
        let rx = rx.clone();
        tokio::spawn(async move {
            loop {
                // Hold the lock only while waiting for the next job, so the
                // pool drains the queue concurrently.
                let job = rx.lock().await.recv().await;
                match job {
                    Some(job) => {
                        info!(worker_id, document_id = %job.document_id, "picked up ingest job");
                        pipeline.process(job).await;
                    }
                    None => break,
                }
            }
            info!(worker_id, "ingest worker shutting down");
        });
    }

    IngestQueue { tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quizforge_core::domain::*;
    use quizforge_core::ports::*;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingDb {
        documents: StdMutex<HashMap<Uuid, Document>>,
        texts: StdMutex<HashMap<Uuid, ExtractedText>>,
    }

    #[async_trait]
    impl DatabaseService for RecordingDb {
        async fn create_user_with_email(
            &self,
            _email: &str,
            _hashed_password: &str,
            _full_name: Option<&str>,
        ) -> PortResult<User> {
            unimplemented!()
        }
        async fn get_user_by_email(&self, _email: &str) -> PortResult<UserCredentials> {
            unimplemented!()
        }
        async fn get_user_by_id(&self, _user_id: Uuid) -> PortResult<User> {
            unimplemented!()
        }
        async fn create_auth_session(
            &self,
            _session_id: &str,
            _user_id: Uuid,
            _expires_at: chrono::DateTime<chrono::Utc>,
        ) -> PortResult<()> {
            unimplemented!()
        }
        async fn validate_auth_session(&self, _session_id: &str) -> PortResult<Uuid> {
            unimplemented!()
        }
        async fn delete_auth_session(&self, _session_id: &str) -> PortResult<()> {
            unimplemented!()
        }
        async fn get_user_settings(
            &self,
            _user_id: Uuid,
        ) -> PortResult<Option<serde_json::Value>> {
            unimplemented!()
        }
        async fn upsert_user_settings(
            &self,
            _user_id: Uuid,
            _preferences: &serde_json::Value,
        ) -> PortResult<()> {
            unimplemented!()
        }

        async fn insert_document(&self, document: &Document) -> PortResult<()> {
            self.documents
                .lock()
                .unwrap()
                .insert(document.id, document.clone());
            Ok(())
        }
        async fn get_document(&self, document_id: Uuid, owner_id: Uuid) -> PortResult<Document> {
            self.documents
                .lock()
                .unwrap()
                .get(&document_id)
                .filter(|d| d.owner_id == owner_id)
                .cloned()
                .ok_or_else(|| PortError::NotFound("document".to_string()))
        }
        async fn list_documents(&self, _owner_id: Uuid) -> PortResult<Vec<Document>> {
            Ok(Vec::new())
        }
        async fn mark_document_processing(&self, document_id: Uuid) -> PortResult<bool> {
            let mut docs = self.documents.lock().unwrap();
            let doc = docs
                .get_mut(&document_id)
                .ok_or_else(|| PortError::NotFound("document".to_string()))?;
            if doc.status == DocumentStatus::Pending {
                doc.status = DocumentStatus::Processing;
                Ok(true)
            } else {
                Ok(false)
            }
        }
        async fn mark_document_completed(
            &self,
            document_id: Uuid,
            storage_location: &str,
        ) -> PortResult<bool> {
            let mut docs = self.documents.lock().unwrap();
            let doc = docs
                .get_mut(&document_id)
                .ok_or_else(|| PortError::NotFound("document".to_string()))?;
            doc.status = DocumentStatus::Completed;
            doc.storage_location = Some(storage_location.to_string());
            Ok(true)
        }
        async fn mark_document_failed(
            &self,
            document_id: Uuid,
            error_message: &str,
        ) -> PortResult<()> {
            let mut docs = self.documents.lock().unwrap();
            if let Some(doc) = docs.get_mut(&document_id) {
                doc.status = DocumentStatus::Failed;
                doc.error_message = Some(error_message.to_string());
            }
            Ok(())
        }
        async fn delete_document(&self, _document_id: Uuid, _owner_id: Uuid) -> PortResult<()> {
            unimplemented!()
        }

        async fn insert_extracted_text(&self, extracted: &ExtractedText) -> PortResult<()> {
            self.texts
                .lock()
                .unwrap()
                .insert(extracted.document_id, extracted.clone());
            Ok(())
        }
        async fn get_extracted_text(&self, _document_id: Uuid) -> PortResult<ExtractedText> {
            unimplemented!()
        }

        async fn insert_ruleset(&self, _ruleset: &Ruleset) -> PortResult<()> {
            unimplemented!()
        }
        async fn get_ruleset(&self, _ruleset_id: Uuid) -> PortResult<Ruleset> {
            unimplemented!()
        }
        async fn get_ruleset_owned(
            &self,
            _ruleset_id: Uuid,
            _owner_id: Uuid,
        ) -> PortResult<Ruleset> {
            unimplemented!()
        }
        async fn list_rulesets(&self, _owner_id: Uuid) -> PortResult<Vec<Ruleset>> {
            unimplemented!()
        }

        async fn insert_questions(&self, _questions: &[GeneratedQuestion]) -> PortResult<()> {
            unimplemented!()
        }
        async fn recent_question_texts(
            &self,
            _ruleset_id: Uuid,
            _limit: u32,
        ) -> PortResult<Vec<String>> {
            unimplemented!()
        }
        async fn get_questions_by_ids(&self, _ids: &[Uuid]) -> PortResult<Vec<GeneratedQuestion>> {
            unimplemented!()
        }

        async fn insert_quiz(&self, _quiz: &QuizSession) -> PortResult<()> {
            unimplemented!()
        }
        async fn get_quiz(&self, _quiz_id: Uuid, _owner_id: Uuid) -> PortResult<QuizSession> {
            unimplemented!()
        }
        async fn begin_quiz(
            &self,
            _quiz_id: Uuid,
            _owner_id: Uuid,
            _start_time: chrono::DateTime<chrono::Utc>,
        ) -> PortResult<bool> {
            unimplemented!()
        }
        async fn insert_answer(&self, _answer: &AnswerSubmission) -> PortResult<()> {
            unimplemented!()
        }
        async fn list_answers(&self, _quiz_id: Uuid) -> PortResult<Vec<AnswerSubmission>> {
            unimplemented!()
        }
        async fn complete_quiz(
            &self,
            _quiz_id: Uuid,
            _owner_id: Uuid,
            _end_time: chrono::DateTime<chrono::Utc>,
            _score: f64,
        ) -> PortResult<bool> {
            unimplemented!()
        }
    }

    struct NullStore;

    #[async_trait]
    impl ObjectStoreService for NullStore {
        async fn put(&self, _path: &str, _bytes: &[u8], _content_type: &str) -> PortResult<()> {
            Ok(())
        }
        async fn remove(&self, _path: &str) -> PortResult<()> {
            Ok(())
        }
    }

    struct FixedExtractor;

    #[async_trait]
    impl TextExtractionService for FixedExtractor {
        async fn extract(&self, _format: FileFormat, _content: &[u8]) -> PortResult<String> {
            Ok("extracted".to_string())
        }
    }

    #[tokio::test]
    async fn workers_drain_enqueued_jobs_to_completion() {
        let db = Arc::new(RecordingDb::default());
        let pipeline = Arc::new(IngestionPipeline::new(
            db.clone(),
            Arc::new(NullStore),
            Arc::new(FixedExtractor),
        ));
        let queue = spawn_ingest_workers(pipeline.clone(), 2);

        let owner = Uuid::new_v4();
        let mut ids = Vec::new();
        for i in 0..5 {
            let (document, job) = pipeline
                .submit(owner, &format!("doc{i}.pdf"), b"%PDF".to_vec())
                .await
                .unwrap();
            queue.enqueue(job).await.unwrap();
            ids.push(document.id);
        }

        // Poll until the pool has processed everything.
        for _ in 0..50 {
            let done = {
                let docs = db.documents.lock().unwrap();
                ids.iter()
                    .all(|id| docs[id].status == DocumentStatus::Completed)
            };
            if done {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("ingestion workers did not finish in time");
    }
}
