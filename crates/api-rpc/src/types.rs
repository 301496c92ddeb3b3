//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results.

use docpipe_core::domain::{Job, StrategyKey};
use serde::{Deserialize, Serialize};

/// doc.submit.v1 - Submit a document
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    /// Raw document bytes, standard base64
    pub document_base64: String,
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default)]
    pub filename: Option<String>,
}

fn default_strategy() -> String {
    StrategyKey::FAST_LOCAL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub state: String,
}

/// doc.status.v1 - Read a job snapshot
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub job_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub job_id: String,
    pub state: String,
    pub strategy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Job> for StatusResponse {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            state: job.state.to_string(),
            strategy: job.strategy.to_string(),
            filename: job.filename,
            progress: job.progress,
            content: job.content,
            summary: job.summary,
            error: job.error,
            attempts: job.attempts,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// admin.stats.v1 - Get system statistics (no parameters)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_jobs: i64,
    pub pending_jobs: i64,
    pub processing_jobs: i64,
    pub completed_jobs: i64,
    pub error_jobs: i64,
    pub queue_depth: i64,
    pub uptime_seconds: i64,
}
