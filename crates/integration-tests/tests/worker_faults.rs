//! Failures inside a job end that job in `error` and never take the worker down

mod common;

use common::{manual_clock, registry_with, two_page_report, Pipeline, VISIBILITY_TIMEOUT_MS};
use docpipe_core::application::{StrategyRegistry, SubmitRequest, WorkerConfig};
use docpipe_core::domain::JobState;
use docpipe_core::port::extraction::mocks::MockStrategy;
use docpipe_infra_extract::FastLocalStrategy;
use std::sync::Arc;
use std::time::Duration;

fn request(strategy: &str) -> SubmitRequest {
    SubmitRequest {
        document: two_page_report(),
        strategy: strategy.to_string(),
        filename: Some("scan.pdf".to_string()),
    }
}

#[tokio::test]
async fn test_panicking_strategy_fails_job_and_worker_continues() {
    let registry = StrategyRegistry::new()
        .register("fast-local", Arc::new(FastLocalStrategy::new()))
        .register(
            "ai-vision",
            Arc::new(MockStrategy::new_panic_inducing("vision backend exploded")),
        );
    let pipeline = Pipeline::new(registry).await;

    let doomed = pipeline.submission.submit(request("ai-vision")).await.unwrap();
    let healthy = pipeline.submission.submit(request("fast-local")).await.unwrap();

    let worker = pipeline.worker("worker-1");
    assert!(worker.process_next_job().await.unwrap());
    assert!(worker.process_next_job().await.unwrap());

    let failed = pipeline.status.get_status(&doomed).await.unwrap();
    assert_eq!(failed.state, JobState::Error);
    assert!(failed.error.unwrap().contains("vision backend exploded"));
    assert!(failed.content.is_none());
    assert!(failed.summary.is_none());

    let done = pipeline.status.get_status(&healthy).await.unwrap();
    assert_eq!(done.state, JobState::Completed);
}

#[tokio::test]
async fn test_hanging_strategy_times_out() {
    let pipeline = Pipeline::new(registry_with(
        "fast-local",
        Arc::new(MockStrategy::new_hanging(Duration::from_secs(30))),
    ))
    .await;
    let job_id = pipeline.submission.submit(request("fast-local")).await.unwrap();

    let worker = pipeline.worker_with(
        "worker-1",
        WorkerConfig {
            extraction_timeout: Duration::from_millis(100),
            ..WorkerConfig::default()
        },
    );
    let started = std::time::Instant::now();
    assert!(worker.process_next_job().await.unwrap());
    assert!(started.elapsed() < Duration::from_secs(10));

    let job = pipeline.status.get_status(&job_id).await.unwrap();
    assert_eq!(job.state, JobState::Error);
    assert!(job.error.unwrap().contains("timed out"));
    assert_eq!(pipeline.job_queue.depth().await.unwrap(), 0);
}

#[tokio::test]
async fn test_failing_strategy_reports_reason() {
    let pipeline = Pipeline::new(registry_with(
        "fast-local",
        Arc::new(MockStrategy::new_fail("upstream returned 503")),
    ))
    .await;
    let job_id = pipeline.submission.submit(request("fast-local")).await.unwrap();

    pipeline.worker("worker-1").process_next_job().await.unwrap();

    let job = pipeline.status.get_status(&job_id).await.unwrap();
    assert_eq!(job.state, JobState::Error);
    assert!(job.error.unwrap().contains("upstream returned 503"));
}

#[tokio::test]
async fn test_repeatedly_lost_job_is_abandoned() {
    let clock = manual_clock();
    let strategy = Arc::new(MockStrategy::new_success());
    let pipeline =
        Pipeline::with_clock(registry_with("fast-local", strategy.clone()), clock.clone()).await;
    let job_id = pipeline.submission.submit(request("fast-local")).await.unwrap();

    // First delivery is lost without an ack
    pipeline.job_queue.try_dequeue().await.unwrap().unwrap();
    clock.advance(VISIBILITY_TIMEOUT_MS);

    let worker = pipeline.worker_with(
        "worker-1",
        WorkerConfig {
            max_deliveries: 1,
            ..WorkerConfig::default()
        },
    );
    assert!(worker.process_next_job().await.unwrap());

    let job = pipeline.status.get_status(&job_id).await.unwrap();
    assert_eq!(job.state, JobState::Error);
    assert!(job.error.unwrap().contains("Abandoned"));
    assert_eq!(strategy.call_count(), 0);
    assert_eq!(pipeline.job_queue.depth().await.unwrap(), 0);
}
