//! RPC Method Handlers
//!
//! Thin adapters from JSON-RPC requests to dispatcher operations.

use crate::error::to_rpc_error;
use crate::types::{
    AddBotResponse, ClassInfo, RemoveBotResponse, StatusResponse, SubmitOrderRequest,
    SubmitOrderResponse,
};
use dispatch_core::Dispatcher;
use jsonrpsee::types::ErrorObjectOwned;
use tracing::debug;

/// RPC Handler with injected dispatcher
pub struct RpcHandler {
    dispatcher: Dispatcher,
    start_time: std::time::Instant,
}

impl RpcHandler {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            start_time: std::time::Instant::now(),
        }
    }

    /// order.submit.v1
    pub async fn submit_order(
        &self,
        params: SubmitOrderRequest,
    ) -> Result<SubmitOrderResponse, ErrorObjectOwned> {
        // State is read under the same lock as the submit
        let order = self
            .dispatcher
            .submit_order(&params.class)
            .map_err(to_rpc_error)?;

        Ok(SubmitOrderResponse {
            order_id: order.id,
            class: order.class.name,
            state: order.state,
        })
    }

    /// bot.add.v1
    pub async fn add_bot(&self) -> Result<AddBotResponse, ErrorObjectOwned> {
        let bot_id = self.dispatcher.add_worker().map_err(to_rpc_error)?;
        Ok(AddBotResponse { bot_id })
    }

    /// bot.remove.v1
    pub async fn remove_bot(&self) -> Result<RemoveBotResponse, ErrorObjectOwned> {
        let removal = self.dispatcher.remove_worker().map_err(to_rpc_error)?;
        if removal.is_none() {
            debug!("bot.remove.v1 on empty pool");
        }
        Ok(RemoveBotResponse {
            removed: removal.is_some(),
            bot_id: removal.map(|r| r.bot_id),
            requeued_order_id: removal.and_then(|r| r.requeued_order_id),
        })
    }

    /// dispatch.status.v1
    pub async fn status(&self) -> Result<StatusResponse, ErrorObjectOwned> {
        let snapshot = self.dispatcher.snapshot();
        Ok(StatusResponse {
            pending: snapshot.pending,
            processing: snapshot.processing,
            complete: snapshot.complete,
            bots: snapshot.bots,
            processing_duration_ms: self.dispatcher.config().processing_duration_ms(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        })
    }

    /// dispatch.classes.v1
    pub async fn classes(&self) -> Result<Vec<ClassInfo>, ErrorObjectOwned> {
        Ok(self
            .dispatcher
            .classes()
            .into_iter()
            .map(|c| ClassInfo {
                name: c.name,
                label: c.label,
                rank: c.rank,
            })
            .collect())
    }
}
