// Job Store Port (Interface)

use crate::domain::{Job, JobId, JobMutation, JobState};
use crate::error::Result;
use async_trait::async_trait;

/// Durable job record store shared by submitter, worker and status reads.
///
/// `update` must be atomic per record: a reader never sees a terminal
/// state without its result fields, or result fields without the state.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job together with its document bytes
    ///
    /// # Errors
    /// - AppError::DuplicateId if the id is already taken
    async fn create(&self, job: &Job, document: &[u8]) -> Result<JobId>;

    /// Find job by ID (None if unknown)
    async fn find_by_id(&self, id: &str) -> Result<Option<Job>>;

    /// Load the document bytes submitted with a job
    ///
    /// # Errors
    /// - AppError::NotFound if the job does not exist
    async fn get_document(&self, id: &str) -> Result<Vec<u8>>;

    /// Apply a partial update and return the resulting record
    ///
    /// # Errors
    /// - AppError::NotFound if the job does not exist
    /// - AppError::AlreadyTerminal if the job already completed or failed
    /// - AppError::Domain(InvalidStateTransition) if the mutation is not
    ///   allowed from the current state
    async fn update(&self, id: &str, mutation: JobMutation) -> Result<Job>;

    /// Count jobs by state
    async fn count_by_state(&self, state: JobState) -> Result<i64>;

    /// Get job by ID
    ///
    /// # Errors
    /// - AppError::NotFound if the job does not exist
    async fn get(&self, id: &str) -> Result<Job> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| crate::error::AppError::NotFound(format!("Job {} not found", id)))
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use crate::port::TimeProvider;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    struct StoredJob {
        job: Job,
        document: Vec<u8>,
    }

    /// In-memory JobStore; each record is replaced wholesale under one lock
    pub struct InMemoryJobStore {
        jobs: Mutex<HashMap<JobId, StoredJob>>,
        progress_log: Mutex<HashMap<JobId, Vec<String>>>,
        time_provider: Arc<dyn TimeProvider>,
        fail_updates: AtomicBool,
        fail_results: AtomicBool,
    }

    impl InMemoryJobStore {
        pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
            Self {
                jobs: Mutex::new(HashMap::new()),
                progress_log: Mutex::new(HashMap::new()),
                time_provider,
                fail_updates: AtomicBool::new(false),
                fail_results: AtomicBool::new(false),
            }
        }

        /// Make every subsequent `update` fail with AppError::Store
        pub fn set_fail_updates(&self, fail: bool) {
            self.fail_updates.store(fail, Ordering::SeqCst);
        }

        /// Fail only `Complete`/`Fail` writes; start and progress still land
        pub fn set_fail_results(&self, fail: bool) {
            self.fail_results.store(fail, Ordering::SeqCst);
        }

        /// Every progress marker written to a job, oldest first
        pub fn progress_history(&self, id: &str) -> Vec<String> {
            self.progress_log
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .unwrap_or_default()
        }

        pub fn len(&self) -> usize {
            self.jobs.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    #[async_trait]
    impl JobStore for InMemoryJobStore {
        async fn create(&self, job: &Job, document: &[u8]) -> Result<JobId> {
            let mut jobs = self.jobs.lock().unwrap();
            if jobs.contains_key(&job.id) {
                return Err(AppError::DuplicateId(job.id.clone()));
            }
            jobs.insert(
                job.id.clone(),
                StoredJob {
                    job: job.clone(),
                    document: document.to_vec(),
                },
            );
            Ok(job.id.clone())
        }

        async fn find_by_id(&self, id: &str) -> Result<Option<Job>> {
            Ok(self.jobs.lock().unwrap().get(id).map(|s| s.job.clone()))
        }

        async fn get_document(&self, id: &str) -> Result<Vec<u8>> {
            self.jobs
                .lock()
                .unwrap()
                .get(id)
                .map(|s| s.document.clone())
                .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))
        }

        async fn update(&self, id: &str, mutation: JobMutation) -> Result<Job> {
            if self.fail_updates.load(Ordering::SeqCst) {
                return Err(AppError::Store("store unavailable".to_string()));
            }
            let is_result = matches!(
                mutation,
                JobMutation::Complete { .. } | JobMutation::Fail { .. }
            );
            if is_result && self.fail_results.load(Ordering::SeqCst) {
                return Err(AppError::Store("store unavailable".to_string()));
            }

            let now = self.time_provider.now_millis();
            let mut jobs = self.jobs.lock().unwrap();
            let stored = jobs
                .get_mut(id)
                .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))?;

            stored.job.apply(mutation, now)?;
            if let Some(progress) = stored.job.progress.as_ref().filter(|_| !is_result) {
                self.progress_log
                    .lock()
                    .unwrap()
                    .entry(id.to_string())
                    .or_default()
                    .push(progress.clone());
            }
            Ok(stored.job.clone())
        }

        async fn count_by_state(&self, state: JobState) -> Result<i64> {
            Ok(self
                .jobs
                .lock()
                .unwrap()
                .values()
                .filter(|s| s.job.state == state)
                .count() as i64)
        }
    }
}
