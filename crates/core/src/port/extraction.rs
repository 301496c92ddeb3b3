// Extraction Strategy Port
// Abstraction over interchangeable backends producing (content, summary)

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Uniform result of every strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOutput {
    pub content: String,
    pub summary: String,
}

/// Extraction errors
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("No extractable content: {0}")]
    EmptyContent(String),

    #[error("Remote service error: {0}")]
    Remote(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Strategy misconfigured: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// Channel a strategy uses to report informational progress.
///
/// The worker owns the receiving side and is the only writer to the store.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<String>>,
}

impl ProgressReporter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Reporter that drops every message
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn report(&self, progress: impl Into<String>) {
        if let Some(tx) = &self.tx {
            // Receiver gone means the worker stopped listening; progress is best-effort
            let _ = tx.send(progress.into());
        }
    }
}

/// Extraction Strategy trait
///
/// Implementations:
/// - FastLocalStrategy: local PDF text extraction (infra-extract)
/// - AiVisionStrategy: remote Gemini extraction (infra-extract)
///
/// Strategies never touch the job store.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Extract content and summary from raw document bytes
    ///
    /// # Errors
    /// - ExtractionError::MalformedDocument if the bytes cannot be parsed
    /// - ExtractionError::Remote if a backend call fails
    async fn extract(
        &self,
        document: &[u8],
        progress: &ProgressReporter,
    ) -> Result<ExtractionOutput, ExtractionError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Mock strategy behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Succeed with the given content and summary
        Success { content: String, summary: String },
        /// Always fail with message
        Fail(String),
        /// Panic with message (for panic isolation testing)
        Panic(String),
        /// Sleep for the given duration, then succeed
        Hang(Duration),
    }

    /// Mock Extraction Strategy for testing
    pub struct MockStrategy {
        behavior: Arc<Mutex<MockBehavior>>,
        call_count: AtomicUsize,
    }

    impl MockStrategy {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success {
                content: "# Mock document\n\nmock content body".to_string(),
                summary: "mock summary".to_string(),
            })
        }

        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(message.into()))
        }

        pub fn new_panic_inducing(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Panic(message.into()))
        }

        pub fn new_hanging(duration: Duration) -> Self {
            Self::new(MockBehavior::Hang(duration))
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ExtractionStrategy for MockStrategy {
        async fn extract(
            &self,
            _document: &[u8],
            progress: &ProgressReporter,
        ) -> Result<ExtractionOutput, ExtractionError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            let behavior = self.behavior.lock().unwrap().clone();

            match behavior {
                MockBehavior::Success { content, summary } => {
                    progress.report("generating summary");
                    Ok(ExtractionOutput { content, summary })
                }
                MockBehavior::Fail(msg) => Err(ExtractionError::Remote(msg)),
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg); // Actually panic for panic isolation testing
                }
                MockBehavior::Hang(duration) => {
                    tokio::time::sleep(duration).await;
                    Ok(ExtractionOutput {
                        content: "late content".to_string(),
                        summary: "late".to_string(),
                    })
                }
            }
        }
    }
}
