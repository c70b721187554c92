//! JSON-RPC Server
//!
//! Serves the operational endpoints over TCP, bound to localhost by default.

use crate::handler::RpcHandler;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use quartermaster_core::application::{BackgroundScheduler, PartitionService};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9630;

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
    pub fn new(
        config: RpcServerConfig,
        service: Arc<PartitionService>,
        scheduler: Arc<BackgroundScheduler>,
    ) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(service, scheduler)),
        }
    }

    /// Bind and start serving; returns the handle and the bound address
    pub async fn start(self) -> Result<(ServerHandle, SocketAddr), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server.local_addr().map_err(|e| e.to_string())?;

        let mut module = RpcModule::new(());

        let handler = self.handler.clone();
        module
            .register_async_method("partition.check.v1", move |_, _, _| {
                let handler = handler.clone();
                async move { handler.check().await }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("partition.list.v1", move |_, _, _| {
                let handler = handler.clone();
                async move { handler.partitions().await }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("admin.maintenance.v1", move |_, _, _| {
                let handler = handler.clone();
                async move { handler.maintenance().await }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("admin.status.v1", move |_, _, _| {
                let handler = handler.clone();
                async move { handler.status().await }
            })
            .map_err(|e| e.to_string())?;

        info!(addr = %local_addr, "JSON-RPC server listening");

        let handle = server.start(module);
        Ok((handle, local_addr))
    }
}
