//! Daemon configuration
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML
//! file (`DOCPIPE_CONFIG`, default `docpipe.toml`), then `DOCPIPE__*`
//! environment variables (`DOCPIPE__WORKER__COUNT=4`).

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use docpipe_infra_extract::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

const ENV_PREFIX: &str = "DOCPIPE";
const CONFIG_PATH_VAR: &str = "DOCPIPE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "docpipe.toml";
const GOOGLE_API_KEY_VAR: &str = "GOOGLE_API_KEY";
const FALLBACK_DB_PATH: &str = "~/.docpipe/docpipe.db";
/// Upper bound for the queue lease (7 days)
const MAX_VISIBILITY_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub database_url: String,
    pub rpc: RpcSection,
    pub worker: WorkerSection,
    pub submission: SubmissionSection,
    pub gemini: GeminiSection,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcSection {
    pub host: String,
    pub port: u16,
    pub rate_limit_burst: u32,
    pub rate_limit_per_sec: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerSection {
    pub count: usize,
    pub extraction_timeout_secs: u64,
    pub visibility_timeout_secs: u64,
    pub max_deliveries: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubmissionSection {
    pub max_document_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiSection {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            rpc: RpcSection::default(),
            worker: WorkerSection::default(),
            submission: SubmissionSection::default(),
            gemini: GeminiSection::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl Default for RpcSection {
    fn default() -> Self {
        Self {
            host: docpipe_api_rpc::server::DEFAULT_RPC_HOST.to_string(),
            port: docpipe_api_rpc::server::DEFAULT_RPC_PORT,
            rate_limit_burst: 20,
            rate_limit_per_sec: 10,
        }
    }
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            count: 2,
            extraction_timeout_secs: 120,
            visibility_timeout_secs: 300,
            max_deliveries: 3,
        }
    }
}

impl Default for SubmissionSection {
    fn default() -> Self {
        Self {
            max_document_bytes: docpipe_core::application::submission::DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

impl Default for GeminiSection {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            request_timeout_secs: 90,
        }
    }
}

impl DaemonConfig {
    /// Load from the process environment
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let google_key = std::env::var(GOOGLE_API_KEY_VAR).ok();
        Self::load_from(&path, None, google_key)
    }

    /// `env` replaces the process environment when given (tests)
    fn load_from(
        path: &str,
        env: Option<HashMap<String, String>>,
        google_api_key: Option<String>,
    ) -> Result<Self> {
        let mut config: DaemonConfig = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .context("Failed to build config")?
            .try_deserialize()
            .context("Failed to deserialize config")?;

        if config.gemini.api_key.as_deref().map_or(true, str::is_empty) {
            config.gemini.api_key = google_api_key.filter(|k| !k.is_empty());
        }
        config.database_url = expand_database_url(&config.database_url);
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.worker.count == 0 {
            bail!("worker.count must be at least 1");
        }
        if self.worker.extraction_timeout_secs == 0 {
            bail!("worker.extraction_timeout_secs must be positive");
        }
        if self.worker.visibility_timeout_secs <= self.worker.extraction_timeout_secs {
            bail!(
                "worker.visibility_timeout_secs ({}) must exceed worker.extraction_timeout_secs ({})",
                self.worker.visibility_timeout_secs,
                self.worker.extraction_timeout_secs
            );
        }
        if self.worker.visibility_timeout_secs > MAX_VISIBILITY_TIMEOUT_SECS {
            bail!(
                "worker.visibility_timeout_secs ({}) must not exceed {}",
                self.worker.visibility_timeout_secs,
                MAX_VISIBILITY_TIMEOUT_SECS
            );
        }
        if self.worker.max_deliveries == 0 {
            bail!("worker.max_deliveries must be at least 1");
        }
        if self.rpc.rate_limit_burst == 0 {
            bail!("rpc.rate_limit_burst must be at least 1");
        }
        if self.rpc.rate_limit_per_sec == 0 {
            bail!("rpc.rate_limit_per_sec must be at least 1");
        }
        if self.submission.max_document_bytes == 0 {
            bail!("submission.max_document_bytes must be positive");
        }
        Ok(())
    }

    /// Queue lease in milliseconds
    pub fn visibility_timeout_ms(&self) -> Result<i64> {
        i64::try_from(self.worker.visibility_timeout_secs)
            .ok()
            .and_then(|secs| secs.checked_mul(1000))
            .context("worker.visibility_timeout_secs is out of range")
    }

    /// Filesystem path of the database, if it is file-backed
    pub fn database_path(&self) -> Option<PathBuf> {
        let path = strip_sqlite_scheme(&self.database_url);
        if path.contains(":memory:") {
            None
        } else {
            Some(PathBuf::from(path.split('?').next().unwrap_or(path)))
        }
    }
}

fn default_database_url() -> String {
    let path = directories::ProjectDirs::from("dev", "docpipe", "docpipe")
        .map(|dirs| dirs.data_dir().join("docpipe.db").display().to_string())
        .unwrap_or_else(|| shellexpand::tilde(FALLBACK_DB_PATH).into_owned());
    format!("sqlite://{}", path)
}

fn strip_sqlite_scheme(url: &str) -> &str {
    url.strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url)
}

/// Expand `~` in the path part; bare paths get the `sqlite://` scheme
fn expand_database_url(url: &str) -> String {
    let path = strip_sqlite_scheme(url);
    if path.contains(":memory:") {
        return format!("sqlite:{}", path);
    }
    format!("sqlite://{}", shellexpand::tilde(path))
}
