//! Order Dispatch Engine - Daemon Entry Point
//! Runs the dispatcher behind a JSON-RPC server until Ctrl+C.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dispatch_api_rpc::{RpcServer, RpcServerConfig};
use dispatch_core::port::SystemTimeProvider;
use dispatch_core::{DispatchConfig, Dispatcher};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn init_logging() -> Result<()> {
    let log_format = std::env::var("DISPATCH_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("dispatch=info"))
        .context("Failed to create env filter")?;

    match log_format.as_str() {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .try_init()?;
        }
        _ => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .try_init()?;
        }
    }
    Ok(())
}

fn rpc_config_from_env() -> Result<RpcServerConfig> {
    let mut config = RpcServerConfig::default();
    if let Ok(host) = std::env::var("DISPATCH_RPC_HOST") {
        config.host = host;
    }
    if let Ok(port) = std::env::var("DISPATCH_RPC_PORT") {
        config.port = port
            .parse()
            .with_context(|| format!("DISPATCH_RPC_PORT is not a valid port: {}", port))?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging
    init_logging()?;
    info!("Order dispatch engine v{} starting...", VERSION);

    // 2. Load configuration
    let dispatch_config = DispatchConfig::from_env()?;
    let rpc_config = rpc_config_from_env()?;

    // 3. Dispatcher (sole owner of the lifecycle store)
    let dispatcher = Dispatcher::new(dispatch_config, Arc::new(SystemTimeProvider))?;

    // 4. Start JSON-RPC server
    let (rpc_handle, addr) = RpcServer::new(rpc_config, dispatcher.clone())
        .start()
        .await
        .context("RPC server start failed")?;

    info!(addr = %addr, "System ready. Waiting for orders...");
    info!("Press Ctrl+C to shutdown");

    // 5. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 6. Graceful shutdown
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), rpc_handle.stopped()).await;

    let snapshot = dispatcher.snapshot();
    let cancelled = dispatcher.shutdown();
    info!(
        pending = snapshot.pending.len(),
        processing = snapshot.processing.len(),
        complete = snapshot.complete.len(),
        cancelled_timers = cancelled,
        "Shutdown complete."
    );

    Ok(())
}
