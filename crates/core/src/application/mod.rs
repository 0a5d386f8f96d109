// Application Layer - Lifecycle store and dispatch scheduling

pub mod dispatcher;
pub mod store;

// Re-exports
pub use dispatcher::Dispatcher;
pub use store::{Assignment, BotRemoval, DispatchSnapshot, LifecycleStore, TimerTicket};
