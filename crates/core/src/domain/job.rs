// Job Domain Model

use super::error::{DomainError, Result};
use super::strategy::StrategyKey;
use serde::{Deserialize, Serialize};

/// Job ID (UUID v4)
pub type JobId = String;

/// Job State
///
/// Transitions only move forward: `pending -> processing -> {completed | error}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Error,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Error => "error",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(JobState::Pending),
            "processing" => Ok(JobState::Processing),
            "completed" => Ok(JobState::Completed),
            "error" => Ok(JobState::Error),
            other => Err(DomainError::Validation(format!("Unknown job state: {}", other))),
        }
    }
}

/// Partial update applied to a job record by the worker.
///
/// Each variant is written atomically together with its state flip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobMutation {
    /// `pending -> processing`, or reclaim of a redelivered `processing` job
    Start { progress: String },
    /// Informational marker, state stays `processing`
    Progress(String),
    /// `processing -> completed`
    Complete { content: String, summary: String },
    /// `processing -> error`
    Fail { error: String },
}

impl JobMutation {
    /// State the job is in after this mutation
    pub fn target_state(&self) -> JobState {
        match self {
            JobMutation::Start { .. } | JobMutation::Progress(_) => JobState::Processing,
            JobMutation::Complete { .. } => JobState::Completed,
            JobMutation::Fail { .. } => JobState::Error,
        }
    }

    /// States this mutation may be applied from
    pub fn allowed_from(&self) -> &'static [JobState] {
        match self {
            JobMutation::Start { .. } => &[JobState::Pending, JobState::Processing],
            JobMutation::Progress(_) | JobMutation::Complete { .. } | JobMutation::Fail { .. } => {
                &[JobState::Processing]
            }
        }
    }

    /// Reject results that would break the terminal-field invariants
    pub fn validate(&self) -> Result<()> {
        match self {
            JobMutation::Complete { content, summary } => {
                if content.trim().is_empty() {
                    return Err(DomainError::Validation("content must not be empty".into()));
                }
                if summary.trim().is_empty() {
                    return Err(DomainError::Validation("summary must not be empty".into()));
                }
                Ok(())
            }
            JobMutation::Fail { error } if error.trim().is_empty() => Err(
                DomainError::Validation("error description must not be empty".into()),
            ),
            _ => Ok(()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            JobMutation::Start { .. } => "start",
            JobMutation::Progress(_) => "progress",
            JobMutation::Complete { .. } => "complete",
            JobMutation::Fail { .. } => "fail",
        }
    }
}

/// Job Entity
///
/// The submitted document bytes are owned by the store and read through
/// `JobStore::get_document`; the record only carries their size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub state: JobState,
    pub strategy: StrategyKey,
    pub filename: Option<String>,
    pub document_size: i64,

    pub progress: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub error: Option<String>,

    /// Number of times a worker started processing this job
    pub attempts: i32,

    pub created_at: i64, // epoch ms
    pub updated_at: i64,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
}

impl Job {
    /// Create a new pending job
    ///
    /// # Arguments
    ///
    /// * `id` - Unique job ID (injected, not generated)
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    /// * `strategy` - Registered extraction strategy key
    /// * `filename` - Original filename, if the caller supplied one
    /// * `document_size` - Size of the submitted document in bytes
    pub fn new(
        id: impl Into<String>,
        created_at: i64,
        strategy: StrategyKey,
        filename: Option<String>,
        document_size: i64,
    ) -> Self {
        Self {
            id: id.into(),
            state: JobState::Pending,
            strategy,
            filename,
            document_size,
            progress: None,
            content: None,
            summary: None,
            error: None,
            attempts: 0,
            created_at,
            updated_at: created_at,
            started_at: None,
            finished_at: None,
        }
    }

    /// Create a test job with deterministic ID and timestamp.
    ///
    /// Uses a simple counter for deterministic test IDs (test-1, test-2, ...).
    /// Production code should inject ID and time via providers.
    pub fn new_test(strategy: impl Into<String>) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static TEST_COUNTER: AtomicU64 = AtomicU64::new(1);

        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        Self::new(
            format!("test-{}", counter),
            (counter * 1000) as i64,
            StrategyKey::new(strategy),
            None,
            0,
        )
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Apply a mutation with explicit timestamp.
    ///
    /// On error the job is left untouched.
    pub fn apply(&mut self, mutation: JobMutation, now_millis: i64) -> Result<()> {
        if self.state.is_terminal() {
            return Err(DomainError::AlreadyTerminal(self.id.clone()));
        }
        if !mutation.allowed_from().contains(&self.state) {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: mutation.target_state().to_string(),
            });
        }
        mutation.validate()?;

        match mutation {
            JobMutation::Start { progress } => {
                self.state = JobState::Processing;
                self.progress = Some(progress);
                self.attempts += 1;
                self.started_at = Some(now_millis);
            }
            JobMutation::Progress(progress) => {
                self.progress = Some(progress);
            }
            JobMutation::Complete { content, summary } => {
                self.state = JobState::Completed;
                self.progress = None;
                self.content = Some(content);
                self.summary = Some(summary);
                self.finished_at = Some(now_millis);
            }
            JobMutation::Fail { error } => {
                self.state = JobState::Error;
                self.progress = None;
                self.error = Some(error);
                self.finished_at = Some(now_millis);
            }
        }
        self.updated_at = now_millis;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> JobMutation {
        JobMutation::Start {
            progress: "started".into(),
        }
    }

    #[test]
    fn test_new_job_is_pending_and_empty() {
        let job = Job::new_test("fast-local");
        assert_eq!(job.state, JobState::Pending);
        assert!(job.content.is_none() && job.summary.is_none() && job.error.is_none());
        assert_eq!(job.created_at, job.updated_at);
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut job = Job::new_test("fast-local");
        job.apply(start(), 10).unwrap();
        assert_eq!(job.state, JobState::Processing);
        assert_eq!(job.attempts, 1);

        job.apply(JobMutation::Progress("extracting".into()), 20)
            .unwrap();
        assert_eq!(job.progress.as_deref(), Some("extracting"));

        job.apply(
            JobMutation::Complete {
                content: "body".into(),
                summary: "sum".into(),
            },
            30,
        )
        .unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.finished_at, Some(30));
        assert_eq!(job.updated_at, 30);
        assert!(job.error.is_none());
    }

    #[test]
    fn test_terminal_is_write_once() {
        let mut job = Job::new_test("fast-local");
        job.apply(start(), 1).unwrap();
        job.apply(
            JobMutation::Fail {
                error: "boom".into(),
            },
            2,
        )
        .unwrap();

        let snapshot = job.clone();
        let err = job
            .apply(
                JobMutation::Complete {
                    content: "late".into(),
                    summary: "late".into(),
                },
                3,
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::AlreadyTerminal(_)));
        assert_eq!(job, snapshot);
    }

    #[test]
    fn test_progress_requires_processing() {
        let mut job = Job::new_test("fast-local");
        let err = job
            .apply(JobMutation::Progress("early".into()), 1)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition { .. }));
        assert_eq!(job.state, JobState::Pending);
    }

    #[test]
    fn test_complete_rejects_empty_summary() {
        let mut job = Job::new_test("fast-local");
        job.apply(start(), 1).unwrap();
        let err = job
            .apply(
                JobMutation::Complete {
                    content: "text".into(),
                    summary: "  ".into(),
                },
                2,
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(job.state, JobState::Processing);
        assert!(job.content.is_none());
    }

    #[test]
    fn test_restart_counts_attempts() {
        let mut job = Job::new_test("ai-vision");
        job.apply(start(), 1).unwrap();
        job.apply(
            JobMutation::Start {
                progress: "restarted".into(),
            },
            5,
        )
        .unwrap();
        assert_eq!(job.attempts, 2);
        assert_eq!(job.started_at, Some(5));
    }

    #[test]
    fn test_state_round_trips_through_str() {
        for state in [
            JobState::Pending,
            JobState::Processing,
            JobState::Completed,
            JobState::Error,
        ] {
            assert_eq!(state.as_str().parse::<JobState>().unwrap(), state);
        }
        assert!("DONE".parse::<JobState>().is_err());
    }
}
