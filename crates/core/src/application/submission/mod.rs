// Submission Service - validate, create record, enqueue

mod validate;

pub use validate::{validate_request, PDF_SIGNATURE};

use crate::application::StrategyRegistry;
use crate::domain::{Job, JobId, StrategyKey};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, JobQueue, JobStore, QueueMessage, TimeProvider};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Default ceiling for submitted documents (20 MiB)
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 20 * 1024 * 1024;

/// Id generation attempts before a duplicate id is reported
const MAX_ID_ATTEMPTS: usize = 3;

/// Submission request
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub document: Vec<u8>,
    pub strategy: String,
    pub filename: Option<String>,
}

/// Submission limits
#[derive(Debug, Clone)]
pub struct SubmissionPolicy {
    pub max_document_bytes: usize,
}

impl Default for SubmissionPolicy {
    fn default() -> Self {
        Self {
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

/// Submission Service
pub struct SubmissionService {
    job_store: Arc<dyn JobStore>,
    job_queue: Arc<dyn JobQueue>,
    registry: Arc<StrategyRegistry>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    policy: SubmissionPolicy,
}

impl SubmissionService {
    pub fn new(
        job_store: Arc<dyn JobStore>,
        job_queue: Arc<dyn JobQueue>,
        registry: Arc<StrategyRegistry>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        policy: SubmissionPolicy,
    ) -> Self {
        Self {
            job_store,
            job_queue,
            registry,
            id_provider,
            time_provider,
            policy,
        }
    }

    /// Submit a document for processing.
    ///
    /// Returns the new job id once the record is stored and the queue append
    /// is persisted; extraction happens later on a worker.
    ///
    /// # Errors
    /// - AppError::Validation if the request is rejected (nothing is stored)
    /// - AppError::Store if the record or the queue append cannot be persisted
    pub async fn submit(&self, req: SubmitRequest) -> Result<JobId> {
        let strategy = validate_request(&req, &self.registry, &self.policy)?;

        let job_id = self
            .create_record(strategy.clone(), req.filename, &req.document)
            .await?;

        let message = QueueMessage {
            job_id: job_id.clone(),
            strategy: strategy.clone(),
        };
        if let Err(e) = self.job_queue.enqueue(&message).await {
            // The record stays pending with nothing queued for it
            error!(job_id = %job_id, error = %e, "Failed to enqueue job");
            return Err(e);
        }

        info!(
            job_id = %job_id,
            strategy = %strategy,
            document_size = req.document.len(),
            "Job submitted"
        );
        Ok(job_id)
    }

    async fn create_record(
        &self,
        strategy: StrategyKey,
        filename: Option<String>,
        document: &[u8],
    ) -> Result<JobId> {
        let mut last_err = None;

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let job = Job::new(
                self.id_provider.generate_id(),
                self.time_provider.now_millis(),
                strategy.clone(),
                filename.clone(),
                document.len() as i64,
            );

            match self.job_store.create(&job, document).await {
                Ok(id) => return Ok(id),
                Err(AppError::DuplicateId(id)) => {
                    warn!(job_id = %id, attempt, "Generated job id already taken, regenerating");
                    last_err = Some(AppError::DuplicateId(id));
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| AppError::Internal("id generation failed".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobState;
    use crate::port::extraction::mocks::MockStrategy;
    use crate::port::id_provider::mocks::ScriptedIdProvider;
    use crate::port::id_provider::UuidProvider;
    use crate::port::job_queue::mocks::InMemoryJobQueue;
    use crate::port::job_store::mocks::InMemoryJobStore;
    use crate::port::time_provider::SystemTimeProvider;

    struct Fixture {
        store: Arc<InMemoryJobStore>,
        queue: Arc<InMemoryJobQueue>,
        service: SubmissionService,
    }

    fn fixture(id_provider: Arc<dyn IdProvider>) -> Fixture {
        let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
        let store = Arc::new(InMemoryJobStore::new(time_provider.clone()));
        let queue = Arc::new(InMemoryJobQueue::new(time_provider.clone(), 60_000));
        let registry = Arc::new(
            StrategyRegistry::new().register("fast-local", Arc::new(MockStrategy::new_success())),
        );
        let service = SubmissionService::new(
            store.clone(),
            queue.clone(),
            registry,
            id_provider,
            time_provider,
            SubmissionPolicy::default(),
        );
        Fixture {
            store,
            queue,
            service,
        }
    }

    fn request(document: &[u8]) -> SubmitRequest {
        SubmitRequest {
            document: document.to_vec(),
            strategy: "fast-local".to_string(),
            filename: Some("report.pdf".to_string()),
        }
    }

    #[tokio::test]
    async fn test_submit_creates_pending_job_and_enqueues() {
        let f = fixture(Arc::new(UuidProvider));

        let job_id = f.service.submit(request(b"%PDF-1.7 body")).await.unwrap();

        let job = f.store.get(&job_id).await.unwrap();
        assert_eq!(job.state, JobState::Pending);
        assert_eq!(job.filename.as_deref(), Some("report.pdf"));
        assert_eq!(job.document_size, 13);
        assert_eq!(f.store.get_document(&job_id).await.unwrap(), b"%PDF-1.7 body");

        let delivery = f.queue.try_dequeue().await.unwrap().unwrap();
        assert_eq!(delivery.job_id(), job_id);
        assert_eq!(delivery.message.strategy.as_str(), "fast-local");
    }

    #[tokio::test]
    async fn test_rejected_submission_leaves_no_state() {
        let f = fixture(Arc::new(UuidProvider));

        let err = f.service.submit(request(b"GIF89a")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(f.store.is_empty());
        assert_eq!(f.queue.depth().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_regenerated() {
        let f = fixture(Arc::new(ScriptedIdProvider::new(["dup", "dup", "fresh"])));

        let first = f.service.submit(request(b"%PDF-1.4")).await.unwrap();
        let second = f.service.submit(request(b"%PDF-1.4")).await.unwrap();

        assert_eq!(first, "dup");
        assert_eq!(second, "fresh");
        assert_eq!(f.queue.depth().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_enqueue_failure_surfaces_and_leaves_pending_record() {
        let f = fixture(Arc::new(ScriptedIdProvider::new(["orphan"])));
        f.queue.set_fail_enqueue(true);

        let err = f.service.submit(request(b"%PDF-1.4")).await.unwrap_err();
        assert!(matches!(err, AppError::Store(_)));

        // The caller never learns the id; the record stays pending with nothing queued
        let job = f.store.get("orphan").await.unwrap();
        assert_eq!(job.state, JobState::Pending);
        assert_eq!(job.attempts, 0);
        assert_eq!(f.queue.depth().await.unwrap(), 0);
    }
}
