// SQLite JobStore Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use docpipe_core::domain::{DomainError, Job, JobId, JobMutation, JobState, StrategyKey};
use docpipe_core::error::{AppError, Result};
use docpipe_core::port::{JobStore, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Every column except the document blob
const JOB_COLUMNS: &str = "id, state, strategy, filename, document_size, progress, content, \
     summary, error, attempts, created_at, updated_at, started_at, finished_at";

pub struct SqliteJobStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteJobStore {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    /// Explain why a conditional update matched no row
    async fn rejected_update(&self, id: &str, mutation: &JobMutation) -> AppError {
        match self.find_by_id(id).await {
            Ok(None) => AppError::NotFound(format!("Job {} not found", id)),
            Ok(Some(job)) if job.is_terminal() => AppError::AlreadyTerminal(id.to_string()),
            Ok(Some(job)) => AppError::Domain(DomainError::InvalidStateTransition {
                from: job.state.to_string(),
                to: mutation.target_state().to_string(),
            }),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn create(&self, job: &Job, document: &[u8]) -> Result<JobId> {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, state, strategy, filename, document, document_size,
                progress, content, summary, error, attempts,
                created_at, updated_at, started_at, finished_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(job.state.as_str())
        .bind(job.strategy.as_str())
        .bind(&job.filename)
        .bind(document)
        .bind(job.document_size)
        .bind(&job.progress)
        .bind(&job.content)
        .bind(&job.summary)
        .bind(&job.error)
        .bind(job.attempts)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.started_at)
        .bind(job.finished_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match map_sqlx_error(e) {
            AppError::DuplicateId(_) => AppError::DuplicateId(job.id.clone()),
            other => other,
        })?;

        Ok(job.id.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {} FROM jobs WHERE id = ?",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(JobRow::into_job).transpose()
    }

    async fn get_document(&self, id: &str) -> Result<Vec<u8>> {
        sqlx::query_scalar::<_, Vec<u8>>("SELECT document FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))
    }

    async fn update(&self, id: &str, mutation: JobMutation) -> Result<Job> {
        mutation.validate()?;

        let now = self.time_provider.now_millis();
        let allowed = mutation.allowed_from();
        let guard = vec!["?"; allowed.len()].join(", ");

        // One conditional statement per mutation: the state guard and the
        // field writes commit together or not at all
        let set_clause = match &mutation {
            JobMutation::Start { .. } => {
                "state = ?, progress = ?, attempts = attempts + 1, started_at = ?, updated_at = ?"
            }
            JobMutation::Progress(_) => "progress = ?, updated_at = ?",
            JobMutation::Complete { .. } => {
                "state = ?, progress = NULL, content = ?, summary = ?, finished_at = ?, updated_at = ?"
            }
            JobMutation::Fail { .. } => {
                "state = ?, progress = NULL, error = ?, finished_at = ?, updated_at = ?"
            }
        };
        let sql = format!(
            "UPDATE jobs SET {} WHERE id = ? AND state IN ({}) RETURNING {}",
            set_clause, guard, JOB_COLUMNS
        );

        let target = mutation.target_state();
        let mut query = sqlx::query_as::<_, JobRow>(&sql);
        query = match &mutation {
            JobMutation::Start { progress } => query
                .bind(target.as_str())
                .bind(progress)
                .bind(now)
                .bind(now),
            JobMutation::Progress(progress) => query.bind(progress).bind(now),
            JobMutation::Complete { content, summary } => query
                .bind(target.as_str())
                .bind(content)
                .bind(summary)
                .bind(now)
                .bind(now),
            JobMutation::Fail { error } => query
                .bind(target.as_str())
                .bind(error)
                .bind(now)
                .bind(now),
        };
        query = query.bind(id);
        for state in allowed {
            query = query.bind(state.as_str());
        }

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        match row {
            Some(row) => row.into_job(),
            None => Err(self.rejected_update(id, &mutation).await),
        }
    }

    async fn count_by_state(&self, state: JobState) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE state = ?")
            .bind(state.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    state: String,
    strategy: String,
    filename: Option<String>,
    document_size: i64,
    progress: Option<String>,
    content: Option<String>,
    summary: Option<String>,
    error: Option<String>,
    attempts: i32,
    created_at: i64,
    updated_at: i64,
    started_at: Option<i64>,
    finished_at: Option<i64>,
}

impl JobRow {
    fn into_job(self) -> Result<Job> {
        let state: JobState = self.state.parse().map_err(|_| {
            AppError::Store(format!(
                "Job {} has unrecognized state '{}'",
                self.id, self.state
            ))
        })?;

        Ok(Job {
            id: self.id,
            state,
            strategy: StrategyKey::new(self.strategy),
            filename: self.filename,
            document_size: self.document_size,
            progress: self.progress,
            content: self.content,
            summary: self.summary,
            error: self.error,
            attempts: self.attempts,
            created_at: self.created_at,
            updated_at: self.updated_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
        })
    }
}
