// Application Layer - Use Cases and Business Logic

pub mod registry;
pub mod status;
pub mod submission;
pub mod worker;

// Re-exports
pub use registry::StrategyRegistry;
pub use status::StatusService;
pub use submission::{SubmissionPolicy, SubmissionService, SubmitRequest};
pub use worker::{shutdown_channel, ShutdownSender, ShutdownToken, Worker, WorkerConfig};
