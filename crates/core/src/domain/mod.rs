// Domain Layer - Pure business logic and entities

pub mod error;
pub mod job;
pub mod strategy;

// Re-exports
pub use error::DomainError;
pub use job::{Job, JobId, JobMutation, JobState};
pub use strategy::StrategyKey;
