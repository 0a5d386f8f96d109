// Bot Domain Model

use crate::domain::error::{DomainError, Result};
use crate::domain::order::OrderId;
use serde::{Deserialize, Serialize};

/// Bot ID (positive, assigned in creation order)
pub type BotId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BotState {
    Idle,
    Busy,
}

impl std::fmt::Display for BotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BotState::Idle => write!(f, "IDLE"),
            BotState::Busy => write!(f, "BUSY"),
        }
    }
}

/// A worker that processes one order at a time.
///
/// `current_order_id` and `started_at` are `Some` exactly when the bot is Busy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bot {
    pub id: BotId,
    pub state: BotState,
    pub current_order_id: Option<OrderId>,
    pub started_at: Option<i64>,
}

impl Bot {
    pub fn new(id: BotId) -> Self {
        Self {
            id,
            state: BotState::Idle,
            current_order_id: None,
            started_at: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == BotState::Idle
    }

    /// Idle -> Busy. Assigning a busy bot means the scheduler double-booked it.
    pub fn assign(&mut self, order_id: OrderId, now_millis: i64) -> Result<()> {
        if self.state != BotState::Idle {
            return Err(DomainError::InvariantViolation(format!(
                "bot {} is {} with order {:?}, cannot take order {}",
                self.id, self.state, self.current_order_id, order_id
            )));
        }
        self.state = BotState::Busy;
        self.current_order_id = Some(order_id);
        self.started_at = Some(now_millis);
        Ok(())
    }

    /// Busy -> Idle
    pub fn release(&mut self) {
        self.state = BotState::Idle;
        self.current_order_id = None;
        self.started_at = None;
    }

    /// True if this bot is currently processing `order_id`
    pub fn holds(&self, order_id: OrderId) -> bool {
        self.current_order_id == Some(order_id)
    }
}
