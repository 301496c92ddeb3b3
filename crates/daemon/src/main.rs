//! Docpipe daemon - composition root
//!
//! Wires the SQLite store and queue, the extraction strategies, the
//! JSON-RPC boundary and a pool of workers, then waits for Ctrl+C.

mod config;
mod logging;
mod telemetry;

use anyhow::{Context, Result};
use crate::config::DaemonConfig;
use docpipe_api_rpc::{RateLimiter, RpcHandler, RpcServer, RpcServerConfig};
use docpipe_core::application::{
    shutdown_channel, StatusService, StrategyRegistry, SubmissionPolicy, SubmissionService,
    Worker, WorkerConfig,
};
use docpipe_core::domain::StrategyKey;
use docpipe_core::port::{
    IdProvider, JobQueue, JobStore, SystemTimeProvider, TimeProvider, UuidProvider,
};
use docpipe_infra_extract::{AiVisionStrategy, FastLocalStrategy, GeminiConfig};
use docpipe_infra_sqlite::{create_pool, run_migrations, SqliteJobQueue, SqliteJobStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const WORKER_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration, then logging
    let config = DaemonConfig::load()?;
    let _log_guard = logging::init(config.log_format)?;

    info!("Docpipe v{} starting...", VERSION);
    if telemetry::requested_but_disabled() {
        warn!("OpenTelemetry endpoint set but feature 'telemetry' not enabled");
    }

    // 2. Database
    if let Some(path) = config.database_path() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    info!(database_url = %config.database_url, "Initializing database...");
    let pool = create_pool(&config.database_url)
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    // 3. Dependencies (DI wiring)
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let id_provider: Arc<dyn IdProvider> = Arc::new(UuidProvider);
    let job_store: Arc<dyn JobStore> =
        Arc::new(SqliteJobStore::new(pool.clone(), time_provider.clone()));
    let visibility_timeout_ms = config.visibility_timeout_ms()?;
    let job_queue: Arc<dyn JobQueue> = Arc::new(SqliteJobQueue::new(
        pool.clone(),
        time_provider.clone(),
        visibility_timeout_ms,
    ));

    let ai_vision = AiVisionStrategy::new(GeminiConfig {
        api_key: config.gemini.api_key.clone(),
        model: config.gemini.model.clone(),
        base_url: config.gemini.base_url.clone(),
        request_timeout: Duration::from_secs(config.gemini.request_timeout_secs),
    })
    .context("Failed to initialize ai-vision strategy")?;
    if config.gemini.api_key.is_none() {
        warn!("No Gemini API key configured; ai-vision jobs will fail");
    }

    let registry = Arc::new(
        StrategyRegistry::new()
            .register(StrategyKey::FAST_LOCAL, Arc::new(FastLocalStrategy::new()))
            .register(StrategyKey::AI_VISION, Arc::new(ai_vision)),
    );
    info!(strategies = ?registry.keys(), "Strategies registered");

    let submission = Arc::new(SubmissionService::new(
        job_store.clone(),
        job_queue.clone(),
        registry.clone(),
        id_provider,
        time_provider,
        SubmissionPolicy {
            max_document_bytes: config.submission.max_document_bytes,
        },
    ));
    let status = Arc::new(StatusService::new(job_store.clone()));

    // 4. JSON-RPC server
    let handler = Arc::new(RpcHandler::new(
        submission,
        status,
        job_store.clone(),
        job_queue.clone(),
        RateLimiter::new(config.rpc.rate_limit_burst, config.rpc.rate_limit_per_sec),
    ));
    let rpc_server = RpcServer::new(
        RpcServerConfig {
            host: config.rpc.host.clone(),
            port: config.rpc.port,
        },
        handler,
    );
    let (rpc_handle, rpc_addr) = rpc_server
        .start()
        .await
        .context("RPC server start failed")?;

    // 5. Workers
    let (shutdown_tx, _) = shutdown_channel();
    let worker_config = WorkerConfig {
        extraction_timeout: Duration::from_secs(config.worker.extraction_timeout_secs),
        max_deliveries: config.worker.max_deliveries,
    };

    let mut worker_handles = Vec::with_capacity(config.worker.count);
    for i in 0..config.worker.count {
        let worker = Worker::new(
            format!("worker-{}", i + 1),
            job_store.clone(),
            job_queue.clone(),
            registry.clone(),
            worker_config.clone(),
        );
        let token = shutdown_tx.token();
        worker_handles.push(tokio::spawn(async move {
            if let Err(e) = worker.run(token).await {
                error!(worker = %worker.name(), error = ?e, "Worker failed");
            }
        }));
    }

    info!(
        rpc_addr = %rpc_addr,
        workers = config.worker.count,
        "System ready. Press Ctrl+C to shutdown"
    );

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Graceful shutdown: stop intake, then let workers finish their current job
    if let Err(e) = rpc_handle.stop() {
        warn!(error = %e, "RPC server already stopped");
    }
    shutdown_tx.shutdown();
    for handle in worker_handles {
        if tokio::time::timeout(WORKER_SHUTDOWN_GRACE, handle)
            .await
            .is_err()
        {
            warn!("Worker did not stop in time; its job will be redelivered");
        }
    }

    pool.close().await;
    telemetry::shutdown();
    info!("Shutdown complete.");

    Ok(())
}
