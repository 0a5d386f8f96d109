// Domain Layer - Pure business logic and entities

pub mod bot;
pub mod error;
pub mod order;
pub mod pool;
pub mod queue;

// Re-exports
pub use bot::{Bot, BotId, BotState};
pub use error::DomainError;
pub use order::{ClassRegistry, Order, OrderId, OrderState, PriorityClass, Rank};
pub use pool::BotPool;
pub use queue::{priority_order, sort_by_priority, WorkQueue};
