// Dispatch Core - Domain Logic, Ports & Scheduling
// NO RPC or CLI dependencies (hexagonal architecture)

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{BotRemoval, DispatchSnapshot, Dispatcher};
pub use config::{DispatchConfig, PROCESSING_DURATION_MS};
pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
