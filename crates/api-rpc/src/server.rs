//! JSON-RPC Server
//!
//! Serves the dispatcher over JSON-RPC 2.0 on TCP, localhost by default.

use crate::handler::RpcHandler;
use crate::types::SubmitOrderRequest;
use dispatch_core::Dispatcher;
use jsonrpsee::server::{RegisterMethodError, Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9630;

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

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to register method: {0}")]
    Register(#[from] RegisterMethodError),
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(dispatcher)),
        }
    }

    /// Start the JSON-RPC server. Returns the handle and the bound address
    /// (useful when the configured port is 0).
    pub async fn start(self) -> Result<(ServerHandle, SocketAddr), ServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = server.local_addr().map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

        let mut module = RpcModule::new(());

        let handler = self.handler.clone();
        module.register_async_method("order.submit.v1", move |params, _, _| {
            let handler = handler.clone();
            async move {
                let req: SubmitOrderRequest = params.parse()?;
                handler.submit_order(req).await
            }
        })?;

        let handler = self.handler.clone();
        module.register_async_method("bot.add.v1", move |_, _, _| {
            let handler = handler.clone();
            async move { handler.add_bot().await }
        })?;

        let handler = self.handler.clone();
        module.register_async_method("bot.remove.v1", move |_, _, _| {
            let handler = handler.clone();
            async move { handler.remove_bot().await }
        })?;

        let handler = self.handler.clone();
        module.register_async_method("dispatch.status.v1", move |_, _, _| {
            let handler = handler.clone();
            async move { handler.status().await }
        })?;

        let handler = self.handler.clone();
        module.register_async_method("dispatch.classes.v1", move |_, _, _| {
            let handler = handler.clone();
            async move { handler.classes().await }
        })?;

        info!(addr = %local_addr, "JSON-RPC server started");

        let handle = server.start(module);
        Ok((handle, local_addr))
    }
}
