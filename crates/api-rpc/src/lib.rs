//! JSON-RPC API Layer
//!
//! Submission and status boundaries of the document pipeline, plus an
//! admin stats method. Served over HTTP on localhost.

pub mod error;
pub mod handler;
pub mod rate_limiter;
pub mod server;
pub mod types;

pub use handler::RpcHandler;
pub use rate_limiter::RateLimiter;
pub use server::{RpcServer, RpcServerConfig};
