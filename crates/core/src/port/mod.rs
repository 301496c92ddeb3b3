// Port Layer - Interfaces for external dependencies

pub mod extraction;
pub mod id_provider; // For deterministic testing
pub mod job_queue;
pub mod job_store;
pub mod time_provider;

// Re-exports
pub use extraction::{ExtractionError, ExtractionOutput, ExtractionStrategy, ProgressReporter};
pub use id_provider::{IdProvider, UuidProvider};
pub use job_queue::{Delivery, JobQueue, QueueMessage};
pub use job_store::JobStore;
pub use time_provider::{SystemTimeProvider, TimeProvider};
