// Worker - dequeue -> extract -> record loop

pub mod constants;
mod shutdown;

use constants::*;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::StrategyRegistry;
use crate::domain::{Job, JobMutation, JobState};
use crate::error::{AppError, Result};
use crate::port::{Delivery, ExtractionOutput, JobQueue, JobStore, ProgressReporter};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Worker tuning
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Bound on a single strategy invocation
    pub extraction_timeout: Duration,
    /// Deliveries of one queue item before the job is abandoned
    pub max_deliveries: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            extraction_timeout: DEFAULT_EXTRACTION_TIMEOUT,
            max_deliveries: DEFAULT_MAX_DELIVERIES,
        }
    }
}

/// Worker consumes the job queue and drives each job to a terminal state
pub struct Worker {
    name: String,
    job_store: Arc<dyn JobStore>,
    job_queue: Arc<dyn JobQueue>,
    registry: Arc<StrategyRegistry>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(
        name: impl Into<String>,
        job_store: Arc<dyn JobStore>,
        job_queue: Arc<dyn JobQueue>,
        registry: Arc<StrategyRegistry>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            name: name.into(),
            job_store,
            job_queue,
            registry,
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run worker loop with graceful shutdown support
    pub async fn run(&self, mut shutdown: ShutdownToken) -> Result<()> {
        info!(worker = %self.name, "Worker started");
        let mut idle_sleep = IDLE_SLEEP_DURATION;

        loop {
            if shutdown.is_shutdown() {
                info!(worker = %self.name, "Worker shutting down");
                break;
            }
            match self.process_next_job().await {
                Ok(true) => idle_sleep = IDLE_SLEEP_DURATION,
                Ok(false) => {
                    // Queue empty: back off (or wake for shutdown)
                    tokio::select! {
                        _ = sleep(idle_sleep) => {},
                        _ = shutdown.wait() => {
                            info!(worker = %self.name, "Worker interrupted during idle");
                            break;
                        }
                    }
                    idle_sleep = (idle_sleep * 2).min(MAX_IDLE_SLEEP_DURATION);
                }
                Err(e) => {
                    error!(worker = %self.name, error = %e, "Worker error");
                    tokio::select! {
                        _ = sleep(ERROR_RECOVERY_SLEEP_DURATION) => {},
                        _ = shutdown.wait() => {
                            info!(worker = %self.name, "Worker interrupted during error recovery");
                            break;
                        }
                    }
                }
            }
        }
        info!(worker = %self.name, "Worker stopped");
        Ok(())
    }

    /// Process next queue item (returns true if an item was consumed).
    ///
    /// An `Err` leaves the item unacknowledged; it is redelivered once its
    /// lease expires.
    pub async fn process_next_job(&self) -> Result<bool> {
        let delivery = match self.job_queue.try_dequeue().await? {
            Some(d) => d,
            None => return Ok(false),
        };

        debug!(
            worker = %self.name,
            job_id = %delivery.job_id(),
            delivery_count = delivery.delivery_count,
            "Dequeued job"
        );

        self.handle_delivery(&delivery).await?;

        if !self.job_queue.ack(&delivery).await? {
            warn!(
                job_id = %delivery.job_id(),
                "Lease expired before acknowledgement, item may be redelivered"
            );
        }
        Ok(true)
    }

    async fn handle_delivery(&self, delivery: &Delivery) -> Result<()> {
        let job_id = delivery.job_id();

        let job = match self.job_store.find_by_id(job_id).await? {
            Some(job) => job,
            None => {
                warn!(job_id = %job_id, "Queue item without job record, dropping");
                return Ok(());
            }
        };

        if job.is_terminal() {
            info!(
                job_id = %job_id,
                state = %job.state,
                "Redelivered job already finished, acknowledging"
            );
            return Ok(());
        }

        // A previous delivery got as far as Start before it was lost
        let progress = if job.state == JobState::Processing {
            PROGRESS_RESTARTED
        } else {
            PROGRESS_STARTED
        };
        let job = match self
            .job_store
            .update(
                job_id,
                JobMutation::Start {
                    progress: progress.to_string(),
                },
            )
            .await
        {
            Ok(job) => job,
            Err(AppError::AlreadyTerminal(_)) => return Ok(()),
            Err(e) => return Err(e),
        };

        if delivery.delivery_count > self.config.max_deliveries {
            warn!(
                job_id = %job_id,
                delivery_count = delivery.delivery_count,
                max_deliveries = self.config.max_deliveries,
                "Abandoning job after repeated deliveries"
            );
            let reason = format!(
                "Abandoned after {} deliveries without completing",
                delivery.delivery_count
            );
            return self.finish(job_id, Err(reason)).await;
        }

        info!(
            job_id = %job_id,
            strategy = %job.strategy,
            attempt = job.attempts,
            "Processing job"
        );

        let started = Instant::now();
        let outcome = self.run_extraction(&job).await;
        debug!(
            job_id = %job_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            success = outcome.is_ok(),
            "Extraction finished"
        );

        self.finish(job_id, outcome).await
    }

    /// Run the job's strategy with timeout and panic isolation.
    ///
    /// Every failure is flattened into the error text stored on the job.
    async fn run_extraction(&self, job: &Job) -> std::result::Result<ExtractionOutput, String> {
        let document = self
            .job_store
            .get_document(&job.id)
            .await
            .map_err(|e| format!("Failed to load document: {}", e))?;

        let strategy = self.registry.get(&job.strategy).ok_or_else(|| {
            format!(
                "Extraction strategy '{}' is not registered on this worker",
                job.strategy
            )
        })?;

        self.report_progress(&job.id, PROGRESS_EXTRACTING).await;

        // Spawned so a panicking strategy surfaces as a JoinError instead of
        // unwinding through the worker loop
        let (reporter, mut progress_rx) = ProgressReporter::channel();
        let mut handle =
            tokio::spawn(async move { strategy.extract(&document, &reporter).await });

        let deadline = sleep(self.config.extraction_timeout);
        tokio::pin!(deadline);

        let joined = loop {
            tokio::select! {
                biased;
                joined = &mut handle => break Some(joined),
                Some(progress) = progress_rx.recv() => {
                    self.report_progress(&job.id, &progress).await;
                }
                _ = &mut deadline => break None,
            }
        };

        match joined {
            None => {
                handle.abort();
                let timeout_ms = self.config.extraction_timeout.as_millis() as u64;
                warn!(job_id = %job.id, timeout_ms, "Extraction timed out");
                Err(AppError::Timeout(timeout_ms).to_string())
            }
            Some(Ok(Ok(output))) => Ok(output),
            Some(Ok(Err(e))) => Err(AppError::Extraction(e).to_string()),
            Some(Err(join_err)) if join_err.is_panic() => {
                let panic_msg = panic_message(join_err.into_panic());
                error!(job_id = %job.id, panic_msg = %panic_msg, "Extraction panicked");
                Err(format!("Extraction panicked: {}", panic_msg))
            }
            Some(Err(join_err)) => Err(format!("Extraction task cancelled: {}", join_err)),
        }
    }

    /// Write the terminal result
    async fn finish(
        &self,
        job_id: &str,
        outcome: std::result::Result<ExtractionOutput, String>,
    ) -> Result<()> {
        let mutation = match outcome {
            Ok(output) => {
                let complete = JobMutation::Complete {
                    content: output.content,
                    summary: output.summary,
                };
                match complete.validate() {
                    Ok(()) => complete,
                    Err(e) => JobMutation::Fail {
                        error: format!("Strategy returned an unusable result: {}", e),
                    },
                }
            }
            Err(error) => JobMutation::Fail { error },
        };

        match self.job_store.update(job_id, mutation).await {
            Ok(job) => {
                match &job.error {
                    Some(reason) => warn!(job_id = %job_id, error = %reason, "Job failed"),
                    None => info!(job_id = %job_id, "Job completed"),
                }
                Ok(())
            }
            Err(AppError::AlreadyTerminal(_)) => {
                warn!(job_id = %job_id, "Job was finished by another delivery, result discarded");
                Ok(())
            }
            Err(e) => {
                error!(
                    job_id = %job_id,
                    error = %e,
                    "Failed to record job result, job stays processing until redelivery"
                );
                Err(e)
            }
        }
    }

    /// Best-effort progress update; never fails the job
    async fn report_progress(&self, job_id: &str, progress: &str) {
        if let Err(e) = self
            .job_store
            .update(job_id, JobMutation::Progress(progress.to_string()))
            .await
        {
            warn!(job_id = %job_id, progress = %progress, error = %e, "Failed to record progress");
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
