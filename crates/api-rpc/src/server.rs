//! JSON-RPC Server
//!
//! JSON-RPC 2.0 over HTTP on a TCP address (localhost by default).

use crate::handler::RpcHandler;
use crate::types::{StatusRequest, SubmitRequest};
use docpipe_core::error::{AppError, Result};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9627;

/// Request bodies carry base64 documents; leave headroom over the
/// document size limit
const MAX_REQUEST_BODY_BYTES: u32 = 64 * 1024 * 1024;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, handler: Arc<RpcHandler>) -> Self {
        Self { config, handler }
    }

    /// Bind and start serving; returns the handle and the bound address
    /// (port 0 picks a free port)
    pub async fn start(self) -> Result<(ServerHandle, SocketAddr)> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let server = Server::builder()
            .max_request_body_size(MAX_REQUEST_BODY_BYTES)
            .build(&addr)
            .await?;
        let local_addr = server.local_addr()?;

        let mut module = RpcModule::new(());

        let handler = self.handler.clone();
        module
            .register_async_method("doc.submit.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: SubmitRequest = params.parse()?;
                    handler.submit(req).await
                }
            })
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let handler = self.handler.clone();
        module
            .register_async_method("doc.status.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: StatusRequest = params.parse()?;
                    handler.status(req).await
                }
            })
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let handler = self.handler.clone();
        module
            .register_async_method("admin.stats.v1", move |_, _, _| {
                let handler = handler.clone();
                async move { handler.stats().await }
            })
            .map_err(|e| AppError::Internal(e.to_string()))?;

        info!(addr = %local_addr, "JSON-RPC server listening");

        let handle = server.start(module);
        Ok((handle, local_addr))
    }
}
