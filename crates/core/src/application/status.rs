// Status Query Use Case

use crate::domain::Job;
use crate::error::Result;
use crate::port::JobStore;
use std::sync::Arc;
use tracing::debug;

/// Read-only view of job records, safe to poll at any frequency
pub struct StatusService {
    job_store: Arc<dyn JobStore>,
}

impl StatusService {
    pub fn new(job_store: Arc<dyn JobStore>) -> Self {
        Self { job_store }
    }

    /// Current snapshot of a job
    ///
    /// # Errors
    /// - AppError::NotFound for an unknown id
    pub async fn get_status(&self, job_id: &str) -> Result<Job> {
        let job = self.job_store.get(job_id).await?;
        debug!(job_id = %job.id, state = %job.state, "Status read");
        Ok(job)
    }
}
