//! Infrastructure layer: configuration, front door, background workers.

pub mod config;
pub mod gateway;
pub mod rate_limit;
pub mod workers;

mod integration_tests;

pub use config::{ConfigError, RateLimitConfig, StockroomConfig};
pub use gateway::{GatewayError, InventoryGateway};
pub use rate_limit::RateLimiter;
pub use workers::{ChangeWorker, WorkerError, WorkerHandle};
