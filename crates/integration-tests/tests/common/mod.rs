//! Shared fixtures: a file-backed SQLite pipeline and a tiny PDF builder

#![allow(dead_code)]

use async_trait::async_trait;
use docpipe_core::application::{
    StatusService, StrategyRegistry, SubmissionPolicy, SubmissionService, Worker, WorkerConfig,
};
use docpipe_core::port::time_provider::mocks::ManualTimeProvider;
use docpipe_core::port::{
    ExtractionError, ExtractionOutput, ExtractionStrategy, JobQueue, JobStore, ProgressReporter,
    SystemTimeProvider, TimeProvider, UuidProvider,
};
use docpipe_infra_sqlite::{create_pool, run_migrations, SqliteJobQueue, SqliteJobStore};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Notify;

pub const VISIBILITY_TIMEOUT_MS: i64 = 10_000;

/// One pipeline over a SQLite file in a temp directory
pub struct Pipeline {
    pub dir: TempDir,
    pub pool: SqlitePool,
    pub job_store: Arc<dyn JobStore>,
    pub job_queue: Arc<dyn JobQueue>,
    pub registry: Arc<StrategyRegistry>,
    pub submission: Arc<SubmissionService>,
    pub status: Arc<StatusService>,
}

impl Pipeline {
    pub async fn new(registry: StrategyRegistry) -> Self {
        Self::with_clock(registry, Arc::new(SystemTimeProvider)).await
    }

    pub async fn with_clock(registry: StrategyRegistry, time: Arc<dyn TimeProvider>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self::open(dir, registry, time).await
    }

    /// Open (or reopen) the database inside `dir`
    pub async fn open(dir: TempDir, registry: StrategyRegistry, time: Arc<dyn TimeProvider>) -> Self {
        let pool = create_pool(&database_url(dir.path())).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let job_store: Arc<dyn JobStore> = Arc::new(SqliteJobStore::new(pool.clone(), time.clone()));
        let job_queue: Arc<dyn JobQueue> = Arc::new(SqliteJobQueue::new(
            pool.clone(),
            time.clone(),
            VISIBILITY_TIMEOUT_MS,
        ));
        let registry = Arc::new(registry);
        let submission = Arc::new(SubmissionService::new(
            job_store.clone(),
            job_queue.clone(),
            registry.clone(),
            Arc::new(UuidProvider),
            time,
            SubmissionPolicy::default(),
        ));
        let status = Arc::new(StatusService::new(job_store.clone()));

        Self {
            dir,
            pool,
            job_store,
            job_queue,
            registry,
            submission,
            status,
        }
    }

    pub fn worker(&self, name: &str) -> Worker {
        self.worker_with(name, WorkerConfig::default())
    }

    pub fn worker_with(&self, name: &str, config: WorkerConfig) -> Worker {
        Worker::new(
            name,
            self.job_store.clone(),
            self.job_queue.clone(),
            self.registry.clone(),
            config,
        )
    }

    /// Close the pool and hand back the directory so the database can be reopened
    pub async fn close(self) -> TempDir {
        self.pool.close().await;
        self.dir
    }
}

pub fn database_url(dir: &Path) -> String {
    format!("sqlite://{}", dir.join("docpipe.db").display())
}

pub fn manual_clock() -> Arc<ManualTimeProvider> {
    Arc::new(ManualTimeProvider::new(1_700_000_000_000))
}

pub fn registry_with(key: &str, strategy: Arc<dyn ExtractionStrategy>) -> StrategyRegistry {
    StrategyRegistry::new().register(key, strategy)
}

/// Strategy that waits for a permit before delegating, so a test can observe
/// the job while it is `processing`
pub struct GatedStrategy {
    inner: Arc<dyn ExtractionStrategy>,
    gate: Arc<Notify>,
}

impl GatedStrategy {
    pub fn new(inner: Arc<dyn ExtractionStrategy>) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        (
            Self {
                inner,
                gate: gate.clone(),
            },
            gate,
        )
    }
}

#[async_trait]
impl ExtractionStrategy for GatedStrategy {
    async fn extract(
        &self,
        document: &[u8],
        progress: &ProgressReporter,
    ) -> Result<ExtractionOutput, ExtractionError> {
        self.gate.notified().await;
        self.inner.extract(document, progress).await
    }
}

/// Build a PDF with one page per entry, each page holding the given lines
pub fn build_pdf(pages: &[&[&str]]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let operations: Vec<Operation> = lines
            .iter()
            .enumerate()
            .flat_map(|(i, line)| {
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), (760 - 16 * i as i64).into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ]
            })
            .collect();
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            Content { operations }.encode().unwrap(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// A two-page report with distinctive phrases on each page
pub fn two_page_report() -> Vec<u8> {
    build_pdf(&[
        &[
            "Quarterly report for the northern region.",
            "Revenue grew by twelve percent over the previous quarter.",
            "The warehouse expansion finished two weeks ahead of schedule.",
        ],
        &[
            "Staffing remained stable across all three sites.",
            "Next quarter focuses on reducing delivery times.",
            "Customer satisfaction surveys will be repeated in spring.",
        ],
    ])
}
