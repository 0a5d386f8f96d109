//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results.

use dispatch_core::domain::{Bot, BotId, Order, OrderId, OrderState, Rank};
use serde::{Deserialize, Serialize};

/// order.submit.v1 - Submit an order
#[derive(Debug, Deserialize)]
pub struct SubmitOrderRequest {
    pub class: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOrderResponse {
    pub order_id: OrderId,
    pub class: String,
    pub state: OrderState,
}

/// bot.add.v1 - Add a bot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddBotResponse {
    pub bot_id: BotId,
}

/// bot.remove.v1 - Remove the newest bot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveBotResponse {
    pub removed: bool,
    pub bot_id: Option<BotId>,
    pub requeued_order_id: Option<OrderId>,
}

/// dispatch.status.v1 - Current collections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub pending: Vec<Order>,
    pub processing: Vec<Order>,
    pub complete: Vec<Order>,
    pub bots: Vec<Bot>,
    pub processing_duration_ms: u64,
    pub uptime_seconds: u64,
}

/// dispatch.classes.v1 - Registered order classes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    pub label: String,
    pub rank: Rank,
}
