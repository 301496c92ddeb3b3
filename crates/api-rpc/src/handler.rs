//! RPC Method Handlers
//!
//! Thin adapters from wire types to the application services.

use crate::error::{throttled, to_rpc_error};
use crate::rate_limiter::RateLimiter;
use crate::types::{StatsResponse, StatusRequest, StatusResponse, SubmitRequest, SubmitResponse};
use base64::Engine as _;
use docpipe_core::application::{self, StatusService, SubmissionService};
use docpipe_core::domain::JobState;
use docpipe_core::error::AppError;
use docpipe_core::port::{JobQueue, JobStore};
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    submission: Arc<SubmissionService>,
    status: Arc<StatusService>,
    job_store: Arc<dyn JobStore>,
    job_queue: Arc<dyn JobQueue>,
    rate_limiter: RateLimiter,
    start_time: Instant,
}

impl RpcHandler {
    pub fn new(
        submission: Arc<SubmissionService>,
        status: Arc<StatusService>,
        job_store: Arc<dyn JobStore>,
        job_queue: Arc<dyn JobQueue>,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self {
            submission,
            status,
            job_store,
            job_queue,
            rate_limiter,
            start_time: Instant::now(),
        }
    }

    /// doc.submit.v1
    pub async fn submit(&self, params: SubmitRequest) -> Result<SubmitResponse, ErrorObjectOwned> {
        if !self.rate_limiter.try_acquire() {
            debug!("Submission throttled");
            return Err(throttled());
        }

        let document = base64::engine::general_purpose::STANDARD
            .decode(params.document_base64.as_bytes())
            .map_err(|e| {
                to_rpc_error(AppError::Validation(format!(
                    "document_base64 is not valid base64: {}",
                    e
                )))
            })?;

        let job_id = self
            .submission
            .submit(application::SubmitRequest {
                document,
                strategy: params.strategy,
                filename: params.filename,
            })
            .await
            .map_err(to_rpc_error)?;

        Ok(SubmitResponse {
            job_id,
            state: JobState::Pending.to_string(),
        })
    }

    /// doc.status.v1
    pub async fn status(&self, params: StatusRequest) -> Result<StatusResponse, ErrorObjectOwned> {
        let job = self
            .status
            .get_status(&params.job_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(job.into())
    }

    /// admin.stats.v1
    pub async fn stats(&self) -> Result<StatsResponse, ErrorObjectOwned> {
        let pending = self.count(JobState::Pending).await?;
        let processing = self.count(JobState::Processing).await?;
        let completed = self.count(JobState::Completed).await?;
        let error = self.count(JobState::Error).await?;
        let queue_depth = self.job_queue.depth().await.map_err(to_rpc_error)?;

        Ok(StatsResponse {
            total_jobs: pending + processing + completed + error,
            pending_jobs: pending,
            processing_jobs: processing,
            completed_jobs: completed,
            error_jobs: error,
            queue_depth,
            uptime_seconds: self.start_time.elapsed().as_secs() as i64,
        })
    }

    async fn count(&self, state: JobState) -> Result<i64, ErrorObjectOwned> {
        self.job_store
            .count_by_state(state)
            .await
            .map_err(to_rpc_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::code;
    use docpipe_core::application::{StrategyRegistry, SubmissionPolicy};
    use docpipe_core::port::extraction::mocks::MockStrategy;
    use docpipe_core::port::job_queue::mocks::InMemoryJobQueue;
    use docpipe_core::port::job_store::mocks::InMemoryJobStore;
    use docpipe_core::port::{IdProvider, SystemTimeProvider, TimeProvider, UuidProvider};

    fn handler(rate_limiter: RateLimiter) -> RpcHandler {
        let time: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
        let ids: Arc<dyn IdProvider> = Arc::new(UuidProvider);
        let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new(time.clone()));
        let queue: Arc<dyn JobQueue> = Arc::new(InMemoryJobQueue::new(time.clone(), 60_000));
        let registry = Arc::new(
            StrategyRegistry::new().register("fast-local", Arc::new(MockStrategy::new_success())),
        );

        let submission = Arc::new(SubmissionService::new(
            store.clone(),
            queue.clone(),
            registry,
            ids,
            time,
            SubmissionPolicy::default(),
        ));
        let status = Arc::new(StatusService::new(store.clone()));
        RpcHandler::new(submission, status, store, queue, rate_limiter)
    }

    fn submit_params(document: &[u8], strategy: &str) -> SubmitRequest {
        SubmitRequest {
            document_base64: base64::engine::general_purpose::STANDARD.encode(document),
            strategy: strategy.to_string(),
            filename: Some("scan.pdf".to_string()),
        }
    }

    #[tokio::test]
    async fn test_submit_then_status_is_pending() {
        let handler = handler(RateLimiter::new(10, 10));

        let submitted = handler
            .submit(submit_params(b"%PDF-1.4 body", "fast-local"))
            .await
            .unwrap();
        assert_eq!(submitted.state, "pending");

        let status = handler
            .status(StatusRequest {
                job_id: submitted.job_id.clone(),
            })
            .await
            .unwrap();
        assert_eq!(status.job_id, submitted.job_id);
        assert_eq!(status.state, "pending");
        assert_eq!(status.filename.as_deref(), Some("scan.pdf"));
        assert!(status.content.is_none() && status.error.is_none());

        let stats = handler.stats().await.unwrap();
        assert_eq!(stats.pending_jobs, 1);
        assert_eq!(stats.total_jobs, 1);
        assert_eq!(stats.queue_depth, 1);
    }

    #[tokio::test]
    async fn test_submit_rejections() {
        let handler = handler(RateLimiter::new(10, 10));

        let err = handler
            .submit(submit_params(b"GIF89a", "fast-local"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), code::VALIDATION_ERROR);

        let err = handler
            .submit(submit_params(b"%PDF-1.4", "ocr"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), code::VALIDATION_ERROR);

        let err = handler
            .submit(SubmitRequest {
                document_base64: "***".to_string(),
                strategy: "fast-local".to_string(),
                filename: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), code::VALIDATION_ERROR);

        assert_eq!(handler.stats().await.unwrap().total_jobs, 0);
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let handler = handler(RateLimiter::new(10, 10));
        let err = handler
            .status(StatusRequest {
                job_id: "nope".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), code::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_submit_is_throttled_but_status_is_not() {
        let handler = handler(RateLimiter::new(1, 1));

        let submitted = handler
            .submit(submit_params(b"%PDF-1.4", "fast-local"))
            .await
            .unwrap();
        let err = handler
            .submit(submit_params(b"%PDF-1.4", "fast-local"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), code::THROTTLED);

        for _ in 0..20 {
            let status = handler
                .status(StatusRequest {
                    job_id: submitted.job_id.clone(),
                })
                .await
                .unwrap();
            assert_eq!(status.state, "pending");
        }
    }
}
